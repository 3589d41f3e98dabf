//! NoteStore — per-user named item lists in a single JSON file
//!
//! File layout: `{ "<user id>": { "<note name>": ["item", ...] } }`.
//! Note names and users keep their insertion order.

use indexmap::IndexMap;
use std::path::PathBuf;

use crate::storage::{JsonDocument, StoreError};
use crate::UserId;

/// One user's notes, keyed by note name
pub type UserNotes = IndexMap<String, Vec<String>>;

/// Every user's notes, keyed by the user id's decimal form
pub type NoteCollection = IndexMap<String, UserNotes>;

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Note '{0}' does not exist!")]
    NotFound(String),

    #[error("'{0}' already exists!")]
    AlreadyExists(String),

    #[error("Item {index} does not exist in '{note}' (it has {}).", item_count(.len))]
    ItemOutOfRange { note: String, index: i64, len: usize },

    #[error("Note storage is unavailable: {0}")]
    Storage(#[from] StoreError),
}

fn item_count(len: &usize) -> String {
    match len {
        1 => "1 item".to_string(),
        n => format!("{} items", n),
    }
}

/// Durable CRUD over per-user notes
pub struct NoteStore {
    doc: JsonDocument<NoteCollection>,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let doc = JsonDocument::new(path);
        log::info!("[NOTES] Using note file {}", doc.path().display());
        Self { doc }
    }

    /// Create an empty note
    pub fn create_note(&self, user_id: UserId, name: &str) -> Result<(), NoteError> {
        self.doc.update(|all| {
            let notes = all.entry(user_key(user_id)).or_default();
            if notes.contains_key(name) {
                return Err(NoteError::AlreadyExists(name.to_string()));
            }
            notes.insert(name.to_string(), Vec::new());
            Ok(())
        })
    }

    /// Append an item to the end of a note
    pub fn add_item(&self, user_id: UserId, name: &str, text: &str) -> Result<(), NoteError> {
        self.doc.update(|all| {
            let items = note_mut(all, user_id, name)?;
            items.push(text.to_string());
            Ok(())
        })
    }

    /// Items of a note labelled `1. ...`, `2. ...`; empty if the note has no items
    pub fn show_note(&self, user_id: UserId, name: &str) -> Result<Vec<String>, NoteError> {
        let all = self.doc.load()?;
        let items = all
            .get(&user_key(user_id))
            .and_then(|notes| notes.get(name))
            .ok_or_else(|| NoteError::NotFound(name.to_string()))?;

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item))
            .collect())
    }

    /// Note names in creation order
    pub fn list_notes(&self, user_id: UserId) -> Result<Vec<String>, NoteError> {
        let all = self.doc.load()?;
        Ok(all
            .get(&user_key(user_id))
            .map(|notes| notes.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Replace the item at a 1-based position
    pub fn edit_item(
        &self,
        user_id: UserId,
        name: &str,
        index: i64,
        new_text: &str,
    ) -> Result<(), NoteError> {
        self.doc.update(|all| {
            let items = note_mut(all, user_id, name)?;
            let pos = position(name, index, items.len())?;
            items[pos] = new_text.to_string();
            Ok(())
        })
    }

    /// Remove the item at a 1-based position, returning its text
    pub fn remove_item(&self, user_id: UserId, name: &str, index: i64) -> Result<String, NoteError> {
        self.doc.update(|all| {
            let items = note_mut(all, user_id, name)?;
            let pos = position(name, index, items.len())?;
            Ok(items.remove(pos))
        })
    }

    /// Delete a whole note
    pub fn delete_note(&self, user_id: UserId, name: &str) -> Result<(), NoteError> {
        self.doc.update(|all| {
            let removed = all
                .get_mut(&user_key(user_id))
                .and_then(|notes| notes.shift_remove(name));
            match removed {
                Some(_) => Ok(()),
                None => Err(NoteError::NotFound(name.to_string())),
            }
        })
    }
}

fn user_key(user_id: UserId) -> String {
    user_id.to_string()
}

fn note_mut<'a>(
    all: &'a mut NoteCollection,
    user_id: UserId,
    name: &str,
) -> Result<&'a mut Vec<String>, NoteError> {
    all.get_mut(&user_key(user_id))
        .and_then(|notes| notes.get_mut(name))
        .ok_or_else(|| NoteError::NotFound(name.to_string()))
}

/// Convert a 1-based position into a vector index
fn position(name: &str, index: i64, len: usize) -> Result<usize, NoteError> {
    if index >= 1 && (index as u64) <= len as u64 {
        Ok(index as usize - 1)
    } else {
        Err(NoteError::ItemOutOfRange {
            note: name.to_string(),
            index,
            len,
        })
    }
}
