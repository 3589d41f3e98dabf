//! Ownership of in-flight `/wake` polls.
//!
//! Each user has at most one poll. Starting a new one cancels the old one,
//! a finished poll removes itself, and shutdown cancels whatever is left.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    Awake { attempts: u32 },
    /// The API kept answering, but never with a 200
    TimedOut,
    /// No attempt got any HTTP response; carries the last error
    Unreachable(String),
    Cancelled,
}

impl WakeOutcome {
    /// Text shown to the user in place of the "waking up" message
    pub fn message(&self) -> &'static str {
        match self {
            WakeOutcome::Awake { .. } => "API is now awake!",
            WakeOutcome::TimedOut => "API did not wake up in time. Please try again later.",
            WakeOutcome::Unreachable(_) => "Failed to ping the API. Please try again later.",
            WakeOutcome::Cancelled => "Wake-up cancelled.",
        }
    }
}

/// Handle for one registered poll
#[derive(Debug, Clone)]
pub struct WakeTicket {
    pub user_id: UserId,
    generation: u64,
    token: CancellationToken,
}

impl WakeTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Default)]
pub struct WakeSupervisor {
    polls: DashMap<UserId, (u64, CancellationToken)>,
    next_generation: AtomicU64,
}

impl WakeSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new poll for `user_id`, cancelling any poll it replaces
    pub fn begin(&self, user_id: UserId) -> WakeTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        if let Some((_, previous)) = self.polls.insert(user_id, (generation, token.clone())) {
            log::info!("[WAKE] Replacing running wake-up poll for {}", user_id);
            previous.cancel();
        }

        WakeTicket {
            user_id,
            generation,
            token,
        }
    }

    /// Deregister a finished poll. A newer poll for the same user is left alone.
    pub fn finish(&self, ticket: &WakeTicket) {
        self.polls
            .remove_if(&ticket.user_id, |_, (generation, _)| *generation == ticket.generation);
    }

    pub fn cancel_all(&self) {
        for entry in self.polls.iter() {
            entry.value().1.cancel();
        }
        self.polls.clear();
    }

    pub fn active(&self) -> usize {
        self.polls.len()
    }
}
