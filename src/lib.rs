//! Batch conversion of text files of unknown encoding to UTF-8
//!
//! Each file is sampled to detect its encoding (with an ordered fallback list
//! for low-confidence guesses), then streamed through a stateful decoder in
//! fixed-size chunks. A bounded pool of worker threads converts files
//! concurrently; one file's failure never stops the others, and the run ends
//! with a [`BatchReport`] and an [`ExitStatus`].

pub mod cli;
pub mod conversion;
pub mod detection;
pub mod discovery;
pub mod error;
pub mod transcode;

use std::path::Path;

use tracing::{error, info, warn};

// Re-export commonly used types
pub use conversion::{
    run_batch, BatchConverter, BatchOptions, BatchReport, CancellationToken, ConversionConfig,
    ConversionOutcome, ConversionRequest, Converter, ExitStatus, NoProgress, OutcomeStatus,
    ProgressObserver,
};
pub use detection::{DetectionMethod, EncodingDetector, EncodingGuess};
pub use error::{BatchError, ConversionError, ConversionErrorKind};
pub use transcode::StreamTranscoder;

/// Convert `input` (a file or directory) into `output` with the default
/// configuration and map the result to an exit status.
pub fn run(
    input: &Path,
    output: &Path,
    workers: Option<usize>,
    overwrite: bool,
    recursive: bool,
) -> ExitStatus {
    let options = BatchOptions {
        workers,
        recursive,
        overwrite,
    };

    match run_batch(input, output, &options) {
        Ok(report) => {
            for outcome in &report.failed {
                warn!(
                    source = %outcome.source_path.display(),
                    error = outcome.error.as_deref().unwrap_or("unknown error"),
                    "file failed"
                );
            }
            info!("{}", report.summary());
            report.exit_status()
        }
        Err(e) => {
            error!(error = %e, "batch aborted");
            ExitStatus::FatalError
        }
    }
}
