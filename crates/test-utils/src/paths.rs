//! Temporary data roots for tests that touch the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create an empty data root, removed when the returned guard drops.
pub fn temp_data_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("aa-data-")
        .tempdir()
        .expect("Failed to create temporary data directory")
}

/// Create `path` (and parents) with the given contents.
pub fn write_file(path: &Path, contents: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, contents).expect("Failed to write test file");
    path.to_path_buf()
}
