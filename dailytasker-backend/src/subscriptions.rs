//! Daily quote subscribers, persisted as a JSON array of chat ids.

use std::path::PathBuf;

use crate::storage::{JsonDocument, StoreError};
use crate::UserId;

pub struct SubscriptionStore {
    doc: JsonDocument<Vec<UserId>>,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let doc = JsonDocument::new(path);
        log::info!("[SUBSCRIPTIONS] Using subscriber file {}", doc.path().display());
        Self { doc }
    }

    /// Returns false if the user was already subscribed
    pub fn subscribe(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.doc.update(|users| {
            if users.contains(&user_id) {
                return Ok(false);
            }
            users.push(user_id);
            Ok(true)
        })
    }

    /// Returns false if the user was not subscribed
    pub fn unsubscribe(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.doc.update(|users| {
            let before = users.len();
            users.retain(|u| *u != user_id);
            Ok(users.len() != before)
        })
    }

    pub fn is_subscribed(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.doc.load()?.contains(&user_id))
    }

    /// All subscribers in the order they subscribed
    pub fn list(&self) -> Result<Vec<UserId>, StoreError> {
        self.doc.load()
    }
}
