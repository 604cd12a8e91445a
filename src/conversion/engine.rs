//! Single-file conversion: overwrite policy, detection, transcoding

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, warn};

use crate::conversion::config::ConversionConfig;
use crate::conversion::pool::CancellationToken;
use crate::conversion::stats::ConversionOutcome;
use crate::detection::{EncodingDetector, EncodingGuess, Sample};
use crate::error::{ConversionError, ConversionErrorKind, ConversionResult};
use crate::transcode::{StreamTranscoder, TranscodeStats};

/// One file to convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub overwrite: bool,
}

impl ConversionRequest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
        overwrite: bool,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            overwrite,
        }
    }
}

/// Detection plus transcoding for one file at a time
#[derive(Debug, Clone)]
pub struct Converter {
    detector: EncodingDetector,
    transcoder: StreamTranscoder,
    sample_size: usize,
    cancel: Option<CancellationToken>,
}

impl Converter {
    /// Create a converter; fails if the configuration does not validate
    pub fn new(config: &ConversionConfig) -> ConversionResult<Self> {
        config.validate().map_err(|message| {
            ConversionError::conversion(ConversionErrorKind::configuration(message))
        })?;
        let detector = EncodingDetector::from_config(config).map_err(|message| {
            ConversionError::conversion(ConversionErrorKind::configuration(message))
        })?;

        Ok(Self {
            detector,
            transcoder: StreamTranscoder::from_config(config),
            sample_size: config.sample_size,
            cancel: None,
        })
    }

    /// Observe `token` between chunks
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn detector(&self) -> &EncodingDetector {
        &self.detector
    }

    /// Convert one file. Never fails: problems become a failed outcome.
    pub fn convert(&self, request: &ConversionRequest) -> ConversionOutcome {
        let source = request.source_path.clone();
        let destination = request.destination_path.clone();

        if !request.overwrite && destination.exists() {
            debug!(destination = %destination.display(), "output exists, skipping");
            return ConversionOutcome::skipped(source, destination);
        }

        let started = Instant::now();
        let mut resolved: Option<EncodingGuess> = None;

        match self.try_convert(request, &mut resolved) {
            Ok((guess, stats)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if stats.replaced {
                    warn!(
                        source = %source.display(),
                        encoding = guess.name(),
                        "malformed sequences replaced with U+FFFD"
                    );
                }
                debug!(
                    source = %source.display(),
                    encoding = guess.name(),
                    bytes_in = stats.bytes_read,
                    bytes_out = stats.bytes_written,
                    elapsed_ms,
                    "converted"
                );
                ConversionOutcome::success(
                    source,
                    destination,
                    guess.name(),
                    guess.confidence,
                    stats.bytes_read,
                    stats.bytes_written,
                    elapsed_ms,
                )
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(source = %source.display(), error = %e, "conversion failed");
                ConversionOutcome::failed(
                    source,
                    destination,
                    resolved.map(|guess| guess.name().to_string()),
                    e.user_message(),
                    elapsed_ms,
                )
            }
        }
    }

    fn try_convert(
        &self,
        request: &ConversionRequest,
        resolved: &mut Option<EncodingGuess>,
    ) -> ConversionResult<(EncodingGuess, TranscodeStats)> {
        let source = &request.source_path;
        let destination = &request.destination_path;

        let sample =
            Sample::read(source, self.sample_size).map_err(|e| ConversionError::io(e, source))?;
        let guess = self.detector.detect(&sample)?;
        *resolved = Some(guess);

        ensure_parent_dir(destination)?;
        let stats =
            self.transcoder
                .transcode(source, destination, guess.encoding, self.cancel.as_ref())?;

        Ok((guess, stats))
    }
}

fn ensure_parent_dir(path: &Path) -> ConversionResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ConversionError::io(e, parent))
        }
        _ => Ok(()),
    }
}
