//! Input file discovery

pub mod directory;
pub mod filter;
pub mod path_mapping;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BatchError, BatchResult};

/// What the input path turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    File,
    Directory,
}

/// Discovered input files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub kind: InputKind,
    pub files: Vec<PathBuf>,
}

/// Enumerate the files to convert under `input`.
///
/// A file input yields itself when its extension matches. `output_root` is
/// skipped during the walk when it sits inside the input tree, so earlier
/// outputs are never picked up as inputs.
pub fn discover(
    input: &Path,
    recursive: bool,
    extensions: &[String],
    output_root: Option<&Path>,
) -> BatchResult<Discovery> {
    if !input.exists() {
        return Err(BatchError::InputNotFound(input.to_path_buf()));
    }

    if input.is_file() {
        let files = if filter::has_extension(input, extensions) {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        };
        return Ok(Discovery {
            kind: InputKind::File,
            files,
        });
    }

    let exclude = output_root.and_then(|root| root.canonicalize().ok());
    let files = directory::find_text_files(input, recursive, extensions, exclude.as_deref())
        .map_err(|source| BatchError::Enumeration {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input.to_path_buf()),
            source,
        })?;

    debug!(
        root = %input.display(),
        recursive,
        found = files.len(),
        "input files discovered"
    );

    Ok(Discovery {
        kind: InputKind::Directory,
        files,
    })
}
