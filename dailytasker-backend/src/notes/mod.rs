//! Notes system — per-user named lists of text items
//!
//! Users create notes by name, then append, edit and remove items by their
//! 1-based position. Everything lives in one JSON file.

pub mod store;

pub use store::{NoteError, NoteStore};
