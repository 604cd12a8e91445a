//! Error types and handling infrastructure for UTF-8 conversion

use std::io;
use std::path::PathBuf;

/// Per-file failure causes
#[derive(Debug, thiserror::Error)]
pub enum ConversionErrorKind {
    #[error("Undetectable encoding: {reason}")]
    UndetectableEncoding { reason: String },

    #[error("Decode error: malformed {encoding} sequence at byte {offset}")]
    DecodeFailure { encoding: String, offset: u64 },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Conversion cancelled")]
    Cancelled,

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

impl ConversionErrorKind {
    pub fn undetectable(reason: impl Into<String>) -> Self {
        Self::UndetectableEncoding {
            reason: reason.into(),
        }
    }

    pub fn decode_failure(encoding: &str, offset: u64) -> Self {
        Self::DecodeFailure {
            encoding: encoding.to_string(),
            offset,
        }
    }

    pub fn io(message: String, path: Option<PathBuf>) -> Self {
        Self::Io { message, path }
    }

    pub fn configuration(message: String) -> Self {
        Self::Configuration { message }
    }
}

/// Error raised while converting a single file.
///
/// These never escape the single-file converter; they are turned into
/// failed outcomes there.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct ConversionError {
    kind: ConversionErrorKind,
    #[source]
    source: Option<io::Error>,
}

impl ConversionError {
    pub fn conversion(kind: ConversionErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn undetectable(reason: impl Into<String>) -> Self {
        Self::conversion(ConversionErrorKind::undetectable(reason))
    }

    pub fn decode_failure(encoding: &str, offset: u64) -> Self {
        Self::conversion(ConversionErrorKind::decode_failure(encoding, offset))
    }

    pub fn cancelled() -> Self {
        Self::conversion(ConversionErrorKind::Cancelled)
    }

    /// Wrap an IO error, remembering which file it concerns
    pub fn io(error: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            kind: ConversionErrorKind::io(
                format!("{}: {}", path.display(), error),
                Some(path),
            ),
            source: Some(error),
        }
    }

    pub fn kind(&self) -> &ConversionErrorKind {
        &self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ConversionErrorKind::Cancelled)
    }

    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            ConversionErrorKind::UndetectableEncoding { reason } => {
                format!("Could not determine text encoding ({})", reason)
            }
            ConversionErrorKind::DecodeFailure { encoding, offset } => {
                format!(
                    "Invalid {} data at byte {}; file left unconverted",
                    encoding, offset
                )
            }
            ConversionErrorKind::Io { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

/// Batch-level errors. Any of these aborts the run before a single file is
/// converted.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Input path does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("No {extensions} files found in {}", .root.display())]
    NoInputFiles { root: PathBuf, extensions: String },

    #[error("Invalid worker count {requested}: must be between 1 and {max}")]
    InvalidWorkerCount { requested: usize, max: usize },

    #[error("Failed to enumerate {}: {source}", .path.display())]
    Enumeration {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDirectory { path: PathBuf, source: io::Error },

    #[error("Files {} and {} map to the same output {}", .first.display(), .second.display(), .destination.display())]
    DuplicateDestination {
        first: PathBuf,
        second: PathBuf,
        destination: PathBuf,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Worker pool failed: {0}")]
    WorkerPool(String),
}

impl BatchError {
    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::InputNotFound(path) => format!("Input not found: {}", path.display()),
            Self::NoInputFiles { root, extensions } => {
                format!(
                    "Nothing to convert: no {} files under {}",
                    extensions,
                    root.display()
                )
            }
            Self::Enumeration { path, source } => match source.io_error() {
                Some(io) if io.kind() == io::ErrorKind::PermissionDenied => {
                    format!("Permission denied while scanning {}", path.display())
                }
                _ => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Short hint shown under the error by the CLI
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoInputFiles { .. } => Some("Use --extension to match other file types"),
            Self::InvalidWorkerCount { .. } => Some("Pass a positive value to --workers"),
            Self::Configuration(_) => Some("Check --fallback labels and size options"),
            _ => None,
        }
    }
}

/// Result type for per-file conversion steps
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Result type for batch-level operations
pub type BatchResult<T> = Result<T, BatchError>;
