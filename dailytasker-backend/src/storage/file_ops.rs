//! File operations for JSON documents
//!
//! Whole-file reads and atomic whole-file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a document, returning empty string if not found
pub fn read_document(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Sibling path used while a replacement is being written (e.g. "notes.json" -> ".notes.json.tmp")
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Replace a document atomically (creates parent directories as needed).
///
/// The content is written and synced to a staging file which is then renamed
/// over `path`, so readers see either the old or the new document.
pub fn write_document(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let staging = staging_path(path);
    {
        let mut file = fs::File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&staging, path)
}
