use std::path::Path;
use std::path::PathBuf;

/// Map an input file into the output tree.
/// This preserves the input directory structure relative to `input_root`.
pub fn map_input_to_output(input_root: &Path, input_file: &Path, output_root: &Path) -> PathBuf {
    match input_file.strip_prefix(input_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => match input_file.file_name() {
            Some(name) => output_root.join(name),
            None => output_root.to_path_buf(),
        },
    }
}

/// Output path for a single-file input.
///
/// An existing directory, or a path without an extension, receives the input
/// file's name; anything else is used as the output file itself.
pub fn resolve_single_output(input_file: &Path, output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        match input_file.file_name() {
            Some(name) => output.join(name),
            None => output.to_path_buf(),
        }
    } else {
        output.to_path_buf()
    }
}
