use encoding_rs::{Encoding, SHIFT_JIS, UTF_16LE, UTF_8};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;
use txt2utf8::error::ConversionErrorKind;
use txt2utf8::transcode::StreamTranscoder;
use txt2utf8::CancellationToken;

const TEXT: &str = "Grüße, 世界! こんにちは €100 ok\nzweite Zeile 日本語\n";

fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn transcode_with_chunks(input: &[u8], encoding: &'static Encoding, chunk_size: usize) -> String {
    let mut out = Vec::new();
    StreamTranscoder::new(chunk_size)
        .transcode_stream(&mut Cursor::new(input), &mut out, encoding, None)
        .unwrap();
    String::from_utf8(out).unwrap()
}

fn assert_chunking_is_invisible(input: &[u8], encoding: &'static Encoding, expected: &str) {
    let single_pass = transcode_with_chunks(input, encoding, input.len() + 1);
    assert_eq!(single_pass, expected);
    for chunk_size in 1..=17 {
        assert_eq!(
            transcode_with_chunks(input, encoding, chunk_size),
            single_pass,
            "chunk size {} with {}",
            chunk_size,
            encoding.name()
        );
    }
}

#[test]
fn test_chunk_boundaries_utf8() {
    assert_chunking_is_invisible(TEXT.as_bytes(), UTF_8, TEXT);
}

#[test]
fn test_chunk_boundaries_shift_jis() {
    let text = TEXT.replace(['ü', 'ß', '€'], "-");
    let (bytes, _, had_errors) = SHIFT_JIS.encode(&text);
    assert!(!had_errors);

    assert_chunking_is_invisible(&bytes, SHIFT_JIS, &text);
}

#[test]
fn test_chunk_boundaries_utf16() {
    assert_chunking_is_invisible(&utf16le_with_bom(TEXT), UTF_16LE, TEXT);
}

#[test]
fn test_file_transcode_writes_destination() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("in.txt");
    let dst = td.path().join("out.txt");
    fs::write(&src, utf16le_with_bom("line one\nline two\n")).unwrap();

    let stats = StreamTranscoder::new(5)
        .transcode(&src, &dst, UTF_16LE, None)
        .unwrap();

    assert_eq!(fs::read_to_string(&dst).unwrap(), "line one\nline two\n");
    assert_eq!(stats.bytes_written, 18);
    assert_eq!(stats.bytes_read, fs::metadata(&src).unwrap().len());
}

#[test]
fn test_decode_failure_leaves_no_destination() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("in.txt");
    let dst = td.path().join("out.txt");
    fs::write(&src, b"valid start, then \xFF garbage").unwrap();

    let err = StreamTranscoder::new(4)
        .transcode(&src, &dst, UTF_8, None)
        .unwrap_err();

    match err.kind() {
        ConversionErrorKind::DecodeFailure { encoding, offset } => {
            assert_eq!(encoding, "UTF-8");
            assert_eq!(*offset, 18);
        }
        other => panic!("unexpected error kind: {:?}", other),
    }
    assert!(!dst.exists());
    // Only the source remains; the temporary file is gone
    assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1);
}

#[test]
fn test_decode_failure_keeps_previous_destination() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("in.txt");
    let dst = td.path().join("out.txt");
    fs::write(&src, b"abc\xC3").unwrap();
    fs::write(&dst, "previous output").unwrap();

    assert!(StreamTranscoder::new(2)
        .transcode(&src, &dst, UTF_8, None)
        .is_err());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "previous output");
}

#[test]
fn test_cancelled_transcode_leaves_no_destination() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("in.txt");
    let dst = td.path().join("out.txt");
    fs::write(&src, "some text").unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = StreamTranscoder::new(2)
        .transcode(&src, &dst, UTF_8, Some(&token))
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!dst.exists());
}

#[test]
fn test_lossy_file_transcode() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("in.txt");
    let dst = td.path().join("out.txt");
    fs::write(&src, b"ok \xFF ok").unwrap();

    let stats = StreamTranscoder::new(3)
        .with_lossy(true)
        .transcode(&src, &dst, UTF_8, None)
        .unwrap();

    assert!(stats.replaced);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "ok \u{FFFD} ok");
}
