//! Streaming transcoding to UTF-8
//!
//! Sources are read in fixed-size chunks and pushed through a [`ChunkDecoder`],
//! which owns an `encoding_rs` decoder and therefore keeps partial multi-byte
//! sequences across chunk boundaries. Output goes to a temporary file next to
//! the destination and is renamed into place only when the whole source
//! decoded cleanly, so a failed conversion never leaves a truncated file
//! behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use encoding_rs::{CoderResult, Decoder, DecoderResult, Encoding};
use tracing::{trace, warn};

use crate::conversion::pool::CancellationToken;
use crate::conversion::ConversionConfig;
use crate::error::{ConversionError, ConversionResult};

/// Smallest output buffer handed to the decoder
const MIN_OUTPUT_CAPACITY: usize = 64;

/// Failure while streaming one source
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("malformed input at byte {offset}")]
    Malformed { offset: u64 },

    #[error("cancelled")]
    Cancelled,
}

/// Counters for one transcoded stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub chunks: u64,
    /// Lossy mode substituted at least one U+FFFD
    pub replaced: bool,
}

/// Decoder with retained state between chunks
pub struct ChunkDecoder {
    decoder: Decoder,
    lossy: bool,
    buffer: String,
    consumed: u64,
    replaced: bool,
}

impl ChunkDecoder {
    /// Create a decoder for `encoding`. A BOM matching the encoding is dropped.
    pub fn new(encoding: &'static Encoding, lossy: bool, chunk_size: usize) -> Self {
        let decoder = encoding.new_decoder_with_bom_removal();
        let capacity = decoder
            .max_utf8_buffer_length(chunk_size)
            .unwrap_or_else(|| chunk_size.saturating_mul(3))
            .max(MIN_OUTPUT_CAPACITY);

        Self {
            decoder,
            lossy,
            buffer: String::with_capacity(capacity),
            consumed: 0,
            replaced: false,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    /// Source bytes consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn replaced(&self) -> bool {
        self.replaced
    }

    /// Decode `chunk` and write its UTF-8 form to `out`.
    ///
    /// `last` must be true exactly once, for the final (possibly empty)
    /// chunk; a sequence left incomplete at that point is malformed.
    /// Returns the number of UTF-8 bytes written.
    pub fn decode_chunk<W: Write>(
        &mut self,
        chunk: &[u8],
        last: bool,
        out: &mut W,
    ) -> Result<u64, StreamError> {
        let mut src = chunk;
        let mut written = 0;

        loop {
            let output_full = if self.lossy {
                let (result, read, replaced) =
                    self.decoder.decode_to_string(src, &mut self.buffer, last);
                self.consumed += read as u64;
                self.replaced |= replaced;
                src = &src[read..];
                matches!(result, CoderResult::OutputFull)
            } else {
                let (result, read) =
                    self.decoder
                        .decode_to_string_without_replacement(src, &mut self.buffer, last);
                self.consumed += read as u64;
                src = &src[read..];
                match result {
                    DecoderResult::InputEmpty => false,
                    DecoderResult::OutputFull => true,
                    DecoderResult::Malformed(bad, extra) => {
                        let offset = self
                            .consumed
                            .saturating_sub(bad as u64 + extra as u64);
                        return Err(StreamError::Malformed { offset });
                    }
                }
            };

            written += self.flush(out)?;
            if !output_full {
                return Ok(written);
            }
        }
    }

    fn flush<W: Write>(&mut self, out: &mut W) -> Result<u64, StreamError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        out.write_all(self.buffer.as_bytes())
            .map_err(StreamError::Write)?;
        let written = self.buffer.len() as u64;
        self.buffer.clear();
        Ok(written)
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Chunked source-to-UTF-8 transcoder
#[derive(Debug, Clone, Copy)]
pub struct StreamTranscoder {
    chunk_size: usize,
    lossy: bool,
}

impl StreamTranscoder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            lossy: false,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.chunk_size).with_lossy(config.lossy)
    }

    /// Replace malformed sequences with U+FFFD instead of failing
    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stream `reader` through the decoder into `writer`.
    ///
    /// Cancellation is checked before each chunk is read.
    pub fn transcode_stream<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        encoding: &'static Encoding,
        cancel: Option<&CancellationToken>,
    ) -> Result<TranscodeStats, StreamError> {
        let mut decoder = ChunkDecoder::new(encoding, self.lossy, self.chunk_size);
        let mut chunk = vec![0u8; self.chunk_size];
        let mut stats = TranscodeStats::default();

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(StreamError::Cancelled);
            }

            let n = read_chunk(reader, &mut chunk).map_err(StreamError::Read)?;
            let last = n < self.chunk_size;
            stats.bytes_written += decoder.decode_chunk(&chunk[..n], last, writer)?;
            stats.bytes_read += n as u64;
            stats.chunks += 1;

            if last {
                break;
            }
        }

        stats.replaced = decoder.replaced();
        trace!(
            encoding = encoding.name(),
            chunks = stats.chunks,
            bytes_read = stats.bytes_read,
            "stream transcoded"
        );
        Ok(stats)
    }

    /// Transcode the file at `source` into `destination` as UTF-8.
    ///
    /// The destination's parent directory must exist. On failure the
    /// destination is untouched: it either does not exist or keeps its
    /// previous content.
    pub fn transcode(
        &self,
        source: &Path,
        destination: &Path,
        encoding: &'static Encoding,
        cancel: Option<&CancellationToken>,
    ) -> ConversionResult<TranscodeStats> {
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut input = File::open(source).map_err(|e| ConversionError::io(e, source))?;
        let permissions = input.metadata().map(|m| m.permissions()).ok();

        let mut temp = tempfile::Builder::new()
            .prefix(".txt2utf8-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| ConversionError::io(e, destination))?;

        let stats = {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let stats = self
                .transcode_stream(&mut input, &mut writer, encoding, cancel)
                .map_err(|e| match e {
                    StreamError::Read(e) => ConversionError::io(e, source),
                    StreamError::Write(e) => ConversionError::io(e, destination),
                    StreamError::Malformed { offset } => {
                        ConversionError::decode_failure(encoding.name(), offset)
                    }
                    StreamError::Cancelled => ConversionError::cancelled(),
                })?;
            writer
                .flush()
                .map_err(|e| ConversionError::io(e, destination))?;
            stats
        };

        if let Some(permissions) = permissions {
            if let Err(e) = fs::set_permissions(temp.path(), permissions) {
                warn!(path = %destination.display(), error = %e, "could not copy permissions");
            }
        }

        temp.persist(destination)
            .map_err(|e| ConversionError::io(e.error, destination))?;

        Ok(stats)
    }
}
