//! Flat-file JSON persistence shared by the note store and the subscription list.
//!
//! Every operation loads the whole document and every mutation rewrites it.
//! Writers go through [`JsonDocument::update`], which holds a per-document
//! lock across the load-mutate-save cycle.

pub mod file_ops;
mod json_document;

pub use json_document::JsonDocument;

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The file exists but does not parse. It is left untouched.
    #[error("{} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}
