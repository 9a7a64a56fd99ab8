//! Shared test utilities for temporary model files.

use std::io::Write;
use tempfile::NamedTempFile;
use typegraft::Binary;

/// Creates a temporary file with the given content.
///
/// The file is removed when the returned `NamedTempFile` is dropped.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file
}

/// Saves `model` to a fresh temporary file.
pub fn save_to_temp(model: &Binary) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    model.save(temp_file.path()).unwrap();
    temp_file
}
