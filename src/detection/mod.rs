//! Encoding detection
//!
//! Detection works on a bounded prefix of each file. The primary pass checks,
//! in order: empty input, byte order marks, the NUL layout of BOM-less UTF-16,
//! binary content, UTF-8 validity,
//! and finally a statistical guess from `chardetng` that is verified by
//! decoding the sample. When the resulting confidence is below the configured
//! threshold, an ordered list of fallback encodings is probed and the first
//! one that decodes the whole sample cleanly wins.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use tracing::{debug, trace};

use crate::conversion::ConversionConfig;
use crate::error::{ConversionError, ConversionResult};

/// Confidence reported for a statistical guess that decodes the sample cleanly.
///
/// chardetng only ranks candidates, so very short samples can still land on
/// a wrong single-byte encoding that happens to decode (e.g. `na\xEFve` read
/// as ISO-8859-4).
pub const STATISTICAL_CONFIDENCE: f32 = 0.8;

/// How an encoding was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// Sample was empty; UTF-8 is assumed
    Empty,
    /// A byte order mark named the encoding
    Bom,
    /// NUL layout of BOM-less UTF-16 text
    Utf16Layout,
    /// Sample is valid UTF-8 (this includes plain ASCII)
    Utf8,
    /// Statistical guess from chardetng
    Statistical,
    /// Picked from the fallback list after a low-confidence guess
    Fallback,
}

/// The detector's answer for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingGuess {
    pub encoding: &'static Encoding,
    /// Confidence in the range 0.0-1.0
    pub confidence: f32,
    pub method: DetectionMethod,
}

impl EncodingGuess {
    pub fn new(encoding: &'static Encoding, confidence: f32, method: DetectionMethod) -> Self {
        Self {
            encoding,
            confidence,
            method,
        }
    }

    /// Canonical WHATWG name, e.g. "windows-1252"
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Bytes read from the start of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub bytes: Vec<u8>,
    /// True when the sample holds the entire file
    pub at_eof: bool,
}

impl Sample {
    /// Wrap bytes that represent a complete input
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            at_eof: true,
        }
    }

    /// Read at most `limit` bytes from the start of `path`
    pub fn read(path: &Path, limit: usize) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut bytes = Vec::with_capacity(limit.min(64 * 1024));
        // One extra byte tells us whether the file continues past the sample
        file.take(limit as u64 + 1).read_to_end(&mut bytes)?;
        let at_eof = bytes.len() <= limit;
        bytes.truncate(limit);
        Ok(Self { bytes, at_eof })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Returns true if `bytes` decode under `encoding` without a single malformed
/// sequence. A sequence cut off at the end of a partial sample is accepted.
pub fn probe_decode(encoding: &'static Encoding, bytes: &[u8], at_eof: bool) -> bool {
    let mut decoder = encoding.new_decoder_with_bom_removal();
    let Some(capacity) = decoder.max_utf8_buffer_length_without_replacement(bytes.len()) else {
        return false;
    };
    let mut output = String::with_capacity(capacity);
    let (result, _) = decoder.decode_to_string_without_replacement(bytes, &mut output, at_eof);
    matches!(result, DecoderResult::InputEmpty)
}

/// Recognize BOM-less UTF-16 by where its NUL bytes sit.
///
/// Text in the Latin range has a zero high byte in most code units: at odd
/// offsets for little-endian, at even offsets for big-endian. At least half
/// the units must show the pattern and the other position must be nearly
/// NUL-free.
fn utf16_by_nul_layout(bytes: &[u8]) -> Option<&'static Encoding> {
    let units = bytes.len() / 2;
    if units == 0 {
        return None;
    }

    let (mut even, mut odd) = (0usize, 0usize);
    for (i, &b) in bytes[..units * 2].iter().enumerate() {
        if b == 0 {
            if i % 2 == 0 {
                even += 1;
            } else {
                odd += 1;
            }
        }
    }

    if odd * 2 >= units && even * 10 <= odd {
        Some(UTF_16LE)
    } else if even * 2 >= units && odd * 10 <= even {
        Some(UTF_16BE)
    } else {
        None
    }
}

/// Encoding detector with a fallback policy
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    confidence_threshold: f32,
    fallbacks: Vec<&'static Encoding>,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        // The default labels are known to resolve
        let fallbacks = ConversionConfig::default()
            .resolve_fallbacks()
            .unwrap_or_else(|_| vec![UTF_8]);
        Self::new(crate::conversion::config::DEFAULT_CONFIDENCE_THRESHOLD, fallbacks)
    }
}

impl EncodingDetector {
    pub fn new(confidence_threshold: f32, fallbacks: Vec<&'static Encoding>) -> Self {
        Self {
            confidence_threshold,
            fallbacks,
        }
    }

    /// Build a detector from the threshold and fallback labels of `config`
    pub fn from_config(config: &ConversionConfig) -> Result<Self, String> {
        Ok(Self::new(
            config.confidence_threshold,
            config.resolve_fallbacks()?,
        ))
    }

    pub fn fallbacks(&self) -> &[&'static Encoding] {
        &self.fallbacks
    }

    /// Primary guess without the fallback policy.
    ///
    /// Fails only for binary-looking samples.
    pub fn guess(&self, sample: &Sample) -> ConversionResult<EncodingGuess> {
        let bytes = sample.bytes.as_slice();

        if bytes.is_empty() {
            return Ok(EncodingGuess::new(UTF_8, 1.0, DetectionMethod::Empty));
        }

        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Ok(EncodingGuess::new(encoding, 1.0, DetectionMethod::Bom));
        }

        if let Some(encoding) = utf16_by_nul_layout(bytes) {
            if probe_decode(encoding, bytes, sample.at_eof) {
                return Ok(EncodingGuess::new(
                    encoding,
                    STATISTICAL_CONFIDENCE,
                    DetectionMethod::Utf16Layout,
                ));
            }
        }

        if let Some(position) = bytes.iter().position(|&b| b == 0) {
            return Err(ConversionError::undetectable(format!(
                "NUL byte at offset {}, file looks binary",
                position
            )));
        }

        if probe_decode(UTF_8, bytes, sample.at_eof) {
            return Ok(EncodingGuess::new(UTF_8, 1.0, DetectionMethod::Utf8));
        }

        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(bytes, sample.at_eof);
        let encoding = detector.guess(None, true);
        let confidence = if probe_decode(encoding, bytes, sample.at_eof) {
            STATISTICAL_CONFIDENCE
        } else {
            0.0
        };
        trace!(
            encoding = encoding.name(),
            confidence,
            "statistical guess"
        );

        Ok(EncodingGuess::new(
            encoding,
            confidence,
            DetectionMethod::Statistical,
        ))
    }

    /// Detect the encoding of `sample`, walking the fallback list when the
    /// primary guess is not confident enough.
    pub fn detect(&self, sample: &Sample) -> ConversionResult<EncodingGuess> {
        let guess = self.guess(sample)?;
        if guess.confidence >= self.confidence_threshold {
            debug!(
                encoding = guess.name(),
                confidence = guess.confidence,
                method = ?guess.method,
                "encoding detected"
            );
            return Ok(guess);
        }

        debug!(
            encoding = guess.name(),
            confidence = guess.confidence,
            threshold = self.confidence_threshold,
            "low confidence, trying fallbacks"
        );

        self.fallbacks
            .iter()
            .copied()
            .find(|encoding| probe_decode(*encoding, &sample.bytes, sample.at_eof))
            .map(|encoding| {
                debug!(encoding = encoding.name(), "fallback encoding accepted");
                EncodingGuess::new(encoding, guess.confidence, DetectionMethod::Fallback)
            })
            .ok_or_else(|| {
                let tried = self
                    .fallbacks
                    .iter()
                    .map(|enc| enc.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                ConversionError::undetectable(format!(
                    "best guess {} had confidence {:.2}; no fallback decoded the sample (tried: {})",
                    guess.name(),
                    guess.confidence,
                    if tried.is_empty() { "none" } else { tried.as_str() }
                ))
            })
    }

    /// Detect the encoding of a complete in-memory input
    pub fn detect_bytes(&self, bytes: &[u8]) -> ConversionResult<EncodingGuess> {
        self.detect(&Sample::from_bytes(bytes.to_vec()))
    }

    /// Sample the head of `path` and detect its encoding
    pub fn detect_file(&self, path: &Path, sample_size: usize) -> ConversionResult<EncodingGuess> {
        let sample = Sample::read(path, sample_size).map_err(|e| ConversionError::io(e, path))?;
        self.detect(&sample)
    }
}
