//! File I/O for export documents
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! so an export file is never left half-written.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{VaultError, VaultResult};

/// Write data to a file atomically
pub fn write_atomic(path: &Path, data: &[u8]) -> VaultResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VaultError::io(e, parent))?;
    }

    let temp_path = path.with_extension("tmp");

    let result = write_and_rename(&temp_path, path, data);
    if result.is_err() {
        // Best-effort cleanup
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> VaultResult<()> {
    let mut file = File::create(temp_path).map_err(|e| VaultError::io(e, temp_path))?;
    file.write_all(data)
        .map_err(|e| VaultError::io(e, temp_path))?;
    file.sync_all().map_err(|e| VaultError::io(e, temp_path))?;
    drop(file);

    fs::rename(temp_path, path).map_err(|e| VaultError::io(e, path))
}

pub fn read_to_string(path: &Path) -> VaultResult<String> {
    fs::read_to_string(path).map_err(|e| VaultError::io(e, path))
}
