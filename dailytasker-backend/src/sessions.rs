//! Time-bounded "waiting for a PDF" sessions armed by `/summary`.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::UserId;

pub struct PendingUploads {
    /// Expiry instant per armed user
    armed: DashMap<UserId, Instant>,
    ttl: Duration,
}

impl PendingUploads {
    pub fn new(ttl: Duration) -> Self {
        Self {
            armed: DashMap::new(),
            ttl,
        }
    }

    /// Arm (or re-arm) the user's upload slot
    pub fn arm(&self, user_id: UserId) {
        self.armed.insert(user_id, Instant::now() + self.ttl);
    }

    /// Consume the user's slot. Returns false if none was armed or it expired.
    pub fn take(&self, user_id: UserId) -> bool {
        self.take_at(user_id, Instant::now())
    }

    fn take_at(&self, user_id: UserId, now: Instant) -> bool {
        match self.armed.remove(&user_id) {
            Some((_, expires_at)) => expires_at > now,
            None => false,
        }
    }

    /// Drop expired slots; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.armed.len();
        self.armed.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.armed.len())
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_once() {
        let uploads = PendingUploads::new(Duration::from_secs(60));
        assert!(!uploads.take(1));

        uploads.arm(1);
        assert!(uploads.take(1));
        assert!(!uploads.take(1));
    }

    #[test]
    fn test_expired_slot_is_not_honoured() {
        let uploads = PendingUploads::new(Duration::from_secs(60));
        uploads.arm(1);
        let later = Instant::now() + Duration::from_secs(61);
        assert!(!uploads.take_at(1, later));
        assert_eq!(uploads.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let uploads = PendingUploads::new(Duration::ZERO);
        uploads.arm(1);
        uploads.arm(2);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(uploads.purge_expired(), 2);
        assert_eq!(uploads.len(), 0);

        let uploads = PendingUploads::new(Duration::from_secs(60));
        uploads.arm(3);
        assert_eq!(uploads.purge_expired(), 0);
        assert_eq!(uploads.len(), 1);
    }
}
