use encoding_rs::{SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1251};
use std::fs;
use tempfile::TempDir;
use txt2utf8::detection::{DetectionMethod, EncodingDetector, Sample};
use txt2utf8::ConversionConfig;

fn cyrillic_cp1251() -> Vec<u8> {
    let (bytes, _, had_errors) = WINDOWS_1251.encode("Привет, мир! Это проверка кодировки.");
    assert!(!had_errors);
    bytes.into_owned()
}

#[test]
fn test_fallback_used_when_guess_is_not_confident() {
    let config = ConversionConfig::default()
        .with_confidence_threshold(1.0)
        .with_fallback_encodings(["utf-8", "windows-1251"]);
    let detector = EncodingDetector::from_config(&config).unwrap();

    let guess = detector.detect_bytes(&cyrillic_cp1251()).unwrap();
    assert_eq!(guess.encoding, WINDOWS_1251);
    assert_eq!(guess.method, DetectionMethod::Fallback);
}

#[test]
fn test_fallback_order_is_respected() {
    // Both single-byte encodings decode every byte; the first listed wins
    let config = ConversionConfig::default()
        .with_confidence_threshold(1.0)
        .with_fallback_encodings(["windows-1252", "windows-1251"]);
    let detector = EncodingDetector::from_config(&config).unwrap();

    let guess = detector.detect_bytes(&cyrillic_cp1251()).unwrap();
    assert_eq!(guess.name(), "windows-1252");
}

#[test]
fn test_undetectable_when_no_fallback_decodes() {
    let config = ConversionConfig::default()
        .with_confidence_threshold(1.0)
        .with_fallback_encodings(["utf-8"]);
    let detector = EncodingDetector::from_config(&config).unwrap();

    let err = detector.detect_bytes(&cyrillic_cp1251()).unwrap_err();
    let message = err.user_message();
    assert!(message.contains("Could not determine text encoding"), "{}", message);
    assert!(message.contains("UTF-8"), "{}", message);
}

#[test]
fn test_utf16be_bom() {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "hello".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    let guess = EncodingDetector::default().detect_bytes(&bytes).unwrap();
    assert_eq!(guess.encoding, UTF_16BE);
    assert_eq!(guess.method, DetectionMethod::Bom);
}

#[test]
fn test_utf16le_without_bom() {
    let bytes: Vec<u8> = "hello world\n"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let guess = EncodingDetector::default().detect_bytes(&bytes).unwrap();
    assert_eq!(guess.encoding, UTF_16LE);
    assert_eq!(guess.method, DetectionMethod::Utf16Layout);
}

#[test]
fn test_binary_with_scattered_nuls_still_rejected() {
    let err = EncodingDetector::default()
        .detect_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR")
        .unwrap_err();
    assert!(err.user_message().contains("binary"));
}

#[test]
fn test_utf8_bom() {
    let guess = EncodingDetector::default()
        .detect_bytes(b"\xEF\xBB\xBFplain")
        .unwrap();
    assert_eq!(guess.encoding, UTF_8);
    assert_eq!(guess.method, DetectionMethod::Bom);
}

#[test]
fn test_ascii_is_utf8() {
    let guess = EncodingDetector::default()
        .detect_bytes(b"just ascii text\n")
        .unwrap();
    assert_eq!(guess.encoding, UTF_8);
    assert_eq!(guess.method, DetectionMethod::Utf8);
    assert_eq!(guess.confidence, 1.0);
}

#[test]
fn test_shift_jis_statistical() {
    let text = "日本語のテキストです。これは文字コードの検出を確認するための文章です。".repeat(8);
    let (bytes, _, had_errors) = SHIFT_JIS.encode(&text);
    assert!(!had_errors);

    let guess = EncodingDetector::default().detect_bytes(&bytes).unwrap();
    assert_eq!(guess.encoding, SHIFT_JIS);
    assert_eq!(guess.method, DetectionMethod::Statistical);
}

#[test]
fn test_detect_file_uses_bounded_sample() {
    let td = TempDir::new().unwrap();
    let path = td.path().join("big.txt");
    // Valid UTF-8 head, invalid tail beyond the sample
    let mut bytes = vec![b'a'; 64];
    bytes.push(0xFF);
    fs::write(&path, &bytes).unwrap();

    let guess = EncodingDetector::default().detect_file(&path, 16).unwrap();
    assert_eq!(guess.encoding, UTF_8);

    let sample = Sample::read(&path, 16).unwrap();
    assert_eq!(sample.len(), 16);
    assert!(!sample.at_eof);
}

#[test]
fn test_detect_missing_file_is_io_error() {
    let td = TempDir::new().unwrap();
    let err = EncodingDetector::default()
        .detect_file(&td.path().join("nope.txt"), 1024)
        .unwrap_err();
    assert!(err.user_message().contains("nope.txt"));
}
