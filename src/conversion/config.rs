//! Configuration options for UTF-8 conversion

use encoding_rs::Encoding;

/// Default streaming chunk size (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default number of bytes sampled for encoding detection (1 MiB)
pub const DEFAULT_SAMPLE_SIZE: usize = 1024 * 1024;

/// Largest accepted chunk or sample size (64 MiB)
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Confidence below which the fallback list is consulted
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Fallback encodings tried in order when detection is unsure
pub const DEFAULT_FALLBACK_ENCODINGS: &[&str] = &["utf-8", "windows-1251", "windows-1252"];

/// Extensions converted when none are given
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt"];

/// Conversion configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Bytes read from the source per streaming step
    pub chunk_size: usize,
    /// Bytes sampled from the start of each file for detection
    pub sample_size: usize,
    /// Minimum detector confidence (0.0-1.0) before fallbacks are tried
    pub confidence_threshold: f32,
    /// Ordered encoding labels (WHATWG names) probed on low confidence
    pub fallback_encodings: Vec<String>,
    /// File extensions (without dot, case-insensitive) picked up by discovery
    pub extensions: Vec<String>,
    /// Replace malformed sequences with U+FFFD instead of failing the file
    pub lossy: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fallback_encodings: DEFAULT_FALLBACK_ENCODINGS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            lossy: false,
        }
    }
}

impl ConversionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration for constrained environments (64KB buffers)
    pub fn low_memory() -> Self {
        Self {
            chunk_size: 64 * 1024,
            sample_size: 64 * 1024,
            ..Default::default()
        }
    }

    /// Set streaming chunk size
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set detection sample size
    pub fn with_sample_size(mut self, bytes: usize) -> Self {
        self.sample_size = bytes;
        self
    }

    /// Set the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Replace the fallback encoding list
    pub fn with_fallback_encodings<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_encodings = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the extension filter. Leading dots are ignored.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Enable/disable lossy decoding
    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    /// Resolve fallback labels to encodings, preserving order
    pub fn resolve_fallbacks(&self) -> Result<Vec<&'static Encoding>, String> {
        self.fallback_encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| format!("Unknown fallback encoding '{}'", label))
            })
            .collect()
    }

    /// Human-readable extension list, e.g. ".txt, .log"
    pub fn extensions_description(&self) -> String {
        self.extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 || self.chunk_size > MAX_BUFFER_SIZE {
            return Err(format!(
                "Chunk size must be between 1 byte and {} bytes",
                MAX_BUFFER_SIZE
            ));
        }

        if self.sample_size == 0 || self.sample_size > MAX_BUFFER_SIZE {
            return Err(format!(
                "Sample size must be between 1 byte and {} bytes",
                MAX_BUFFER_SIZE
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if self.extensions.is_empty() || self.extensions.iter().any(|ext| ext.is_empty()) {
            return Err("At least one non-empty extension is required".to_string());
        }

        self.resolve_fallbacks()?;

        Ok(())
    }
}
