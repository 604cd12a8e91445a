use std::path::Path;

/// Return true if the path carries one of `extensions` (case-insensitive)
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Return true if the path is an existing file with a matching extension
pub fn is_text_file(path: &Path, extensions: &[String]) -> bool {
    path.is_file() && has_extension(path, extensions)
}
