use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Find text files in a directory. If recursive is true the whole tree is
/// walked, otherwise only direct children are listed. A directory equal to
/// `exclude` is not descended into. Results are sorted by path.
pub fn find_text_files(
    dir: &Path,
    recursive: bool,
    extensions: &[String],
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut text_files = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry, exclude))
    {
        let entry = entry?;
        let path = entry.path();
        if crate::discovery::filter::is_text_file(path, extensions) {
            text_files.push(path.to_path_buf());
        }
    }

    text_files.sort();
    Ok(text_files)
}

fn is_excluded(entry: &DirEntry, exclude: Option<&Path>) -> bool {
    let Some(exclude) = exclude else {
        return false;
    };
    entry.file_type().is_dir()
        && entry
            .path()
            .canonicalize()
            .is_ok_and(|canonical| canonical == exclude)
}
