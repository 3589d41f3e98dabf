//! Daily quote broadcast.
//!
//! A cron expression picks the wall-clock time (local timezone). At each
//! firing one quote is fetched and sent to every subscriber in turn; a failed
//! send is logged and the loop moves on to the next subscriber.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::content_api::{ContentApiClient, ContentError};
use crate::subscriptions::SubscriptionStore;
use crate::UserId;

pub const QUOTE_UNAVAILABLE: &str = "Couldn't fetch a quote today.";
pub const QUOTE_FAILED: &str = "Oops! Something went wrong while fetching the quote.";

/// Outbound side of the chat transport
#[async_trait]
pub trait BroadcastSender: Send + Sync {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<(), String>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Scheduler {
    schedule: Schedule,
    subscriptions: Arc<SubscriptionStore>,
    content: Arc<ContentApiClient>,
    sender: Arc<dyn BroadcastSender>,
}

impl Scheduler {
    pub fn new(
        cron_expression: &str,
        subscriptions: Arc<SubscriptionStore>,
        content: Arc<ContentApiClient>,
        sender: Arc<dyn BroadcastSender>,
    ) -> Result<Self, String> {
        let schedule = Schedule::from_str(cron_expression)
            .map_err(|e| format!("Invalid cron expression '{}': {}", cron_expression, e))?;

        Ok(Self {
            schedule,
            subscriptions,
            content,
            sender,
        })
    }

    pub fn next_run(&self) -> Option<DateTime<Local>> {
        self.schedule.upcoming(Local).next()
    }

    /// Run until `shutdown_rx` fires
    pub async fn start(&self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut last_run: Option<DateTime<Local>> = None;

        loop {
            let next = match self.schedule.upcoming(Local).find(|t| Some(*t) > last_run) {
                Some(t) => t,
                None => {
                    log::error!("[SCHEDULER] Schedule has no upcoming runs, stopping");
                    return;
                }
            };

            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            log::info!("[SCHEDULER] Next daily quote broadcast at {}", next);

            tokio::select! {
                _ = &mut shutdown_rx => {
                    log::info!("[SCHEDULER] Shutting down");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            last_run = Some(next);

            tokio::select! {
                _ = &mut shutdown_rx => {
                    log::info!("[SCHEDULER] Shutting down during broadcast");
                    return;
                }
                report = self.run_broadcast() => {
                    log::info!(
                        "[SCHEDULER] Daily quote sent to {} subscriber(s), {} failed",
                        report.delivered,
                        report.failed
                    );
                }
            }
        }
    }

    /// Fetch one quote and send it to every subscriber
    pub async fn run_broadcast(&self) -> BroadcastReport {
        let subscribers = match self.subscriptions.list() {
            Ok(s) => s,
            Err(e) => {
                log::error!("[SCHEDULER] Cannot read subscribers: {}", e);
                return BroadcastReport::default();
            }
        };

        if subscribers.is_empty() {
            log::info!("[SCHEDULER] No subscribers, skipping daily quote");
            return BroadcastReport::default();
        }

        let quote = self.content.fetch_quote().await;
        broadcast_quote(&subscribers, &quote, self.sender.as_ref()).await
    }
}

/// Text every subscriber receives for a given fetch result
pub fn broadcast_text(quote: &Result<String, ContentError>) -> String {
    match quote {
        Ok(quote) => format!("Good Morning!\n\nQuote of the Day:\n{}", quote),
        Err(ContentError::Unavailable(_)) => QUOTE_UNAVAILABLE.to_string(),
        Err(e) => {
            log::error!("[SCHEDULER] Error fetching daily quote: {}", e);
            QUOTE_FAILED.to_string()
        }
    }
}

pub async fn broadcast_quote(
    subscribers: &[UserId],
    quote: &Result<String, ContentError>,
    sender: &dyn BroadcastSender,
) -> BroadcastReport {
    let text = broadcast_text(quote);
    let mut report = BroadcastReport::default();

    for user_id in subscribers {
        match sender.send_text(*user_id, &text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                log::warn!("[SCHEDULER] Failed to send daily quote to {}: {}", user_id, e);
                report.failed += 1;
            }
        }
    }

    report
}
