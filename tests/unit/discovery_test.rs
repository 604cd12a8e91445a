use std::fs;
use tempfile::TempDir;
use std::path::{Path, PathBuf};
use txt2utf8::discovery::{self, directory, path_mapping, InputKind};
use txt2utf8::error::BatchError;

fn txt() -> Vec<String> {
    vec!["txt".to_string()]
}

fn tree() -> TempDir {
    let td = TempDir::new().unwrap();
    let sub = td.path().join("sub/deeper");
    fs::create_dir_all(&sub).unwrap();
    fs::write(td.path().join("a.txt"), "A").unwrap();
    fs::write(td.path().join("b.TXT"), "B").unwrap();
    fs::write(td.path().join("c.json"), "{}").unwrap();
    fs::write(sub.join("d.txt"), "D").unwrap();
    td
}

#[test]
fn test_find_text_files_nonrecursive() {
    let td = tree();
    let files = directory::find_text_files(td.path(), false, &txt(), None).unwrap();
    assert_eq!(files, vec![td.path().join("a.txt"), td.path().join("b.TXT")]);
}

#[test]
fn test_find_text_files_recursive() {
    let td = tree();
    let files = directory::find_text_files(td.path(), true, &txt(), None).unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.contains(&td.path().join("sub/deeper/d.txt")));
}

#[test]
fn test_custom_extensions() {
    let td = tree();
    let exts = vec!["json".to_string()];
    let files = directory::find_text_files(td.path(), true, &exts, None).unwrap();
    assert_eq!(files, vec![td.path().join("c.json")]);
}

#[test]
fn test_excluded_directory_is_not_walked() {
    let td = tree();
    let excluded = td.path().join("sub").canonicalize().unwrap();
    let files = directory::find_text_files(td.path(), true, &txt(), Some(&excluded)).unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn test_discover_single_file() {
    let td = tree();
    let found = discovery::discover(&td.path().join("a.txt"), true, &txt(), None).unwrap();
    assert_eq!(found.kind, InputKind::File);
    assert_eq!(found.files.len(), 1);

    let found = discovery::discover(&td.path().join("c.json"), true, &txt(), None).unwrap();
    assert!(found.files.is_empty());
}

#[test]
fn test_discover_missing_input() {
    let td = TempDir::new().unwrap();
    let err = discovery::discover(&td.path().join("missing"), true, &txt(), None).unwrap_err();
    assert!(matches!(err, BatchError::InputNotFound(_)));
}

#[test]
fn test_discovered_files_map_into_output_tree() {
    let td = tree();
    let files = directory::find_text_files(td.path(), true, &txt(), None).unwrap();
    let out = Path::new("out");
    let mapped: Vec<PathBuf> = files
        .iter()
        .map(|file| path_mapping::map_input_to_output(td.path(), file, out))
        .collect();
    assert!(mapped.contains(&PathBuf::from("out/sub/deeper/d.txt")));
    assert!(mapped.contains(&PathBuf::from("out/a.txt")));
}
