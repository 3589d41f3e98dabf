//! Telegram channel (teloxide long polling).
//!
//! Converts updates into [`NormalizedMessage`]s, sends the dispatcher's
//! replies, downloads PDFs for `/summary` and runs `/wake` polls.

use async_trait::async_trait;
use std::sync::Arc;
use teloxide::dispatching::ShutdownToken;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Document;

use crate::channels::{CommandDispatcher, FollowUp, NormalizedMessage};
use crate::content_api::WakeSupervisor;
use crate::scheduler::BroadcastSender;
use crate::UserId;

/// Telegram rejects messages longer than this many characters
pub const MESSAGE_LIMIT: usize = 4096;

const PDF_MIME: &str = "application/pdf";

const DOWNLOAD_FAILED: &str = "Error extracting text from PDF.";

struct ChannelState {
    dispatcher: Arc<CommandDispatcher>,
    wake: Arc<WakeSupervisor>,
}

pub struct TelegramChannel {
    bot: Bot,
    state: Arc<ChannelState>,
}

impl TelegramChannel {
    pub fn new(token: &str, dispatcher: Arc<CommandDispatcher>, wake: Arc<WakeSupervisor>) -> Self {
        Self {
            bot: Bot::new(token),
            state: Arc::new(ChannelState { dispatcher, wake }),
        }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Start long polling in the background
    pub fn start(self) -> (tokio::task::JoinHandle<()>, ShutdownToken) {
        let handler = Update::filter_message().endpoint(handle_message);

        let mut dispatcher = Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.state])
            .default_handler(|_update| async {})
            .build();
        let shutdown = dispatcher.shutdown_token();

        let handle = tokio::spawn(async move {
            log::info!("[TELEGRAM] Polling for updates");
            dispatcher.dispatch().await;
            log::info!("[TELEGRAM] Dispatcher stopped");
        });

        (handle, shutdown)
    }
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<ChannelState>) -> ResponseResult<()> {
    if let Some(document) = msg.document() {
        if is_pdf(document) {
            handle_document(&bot, &msg, document, &state).await?;
        }
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let mut message = NormalizedMessage::new(msg.chat.id.0, text);
    message.user_name = msg.from().map(|u| u.full_name());

    let result = state.dispatcher.dispatch(&message).await;
    if result.is_empty() {
        return Ok(());
    }

    let mut last_sent = None;
    for reply in &result.replies {
        for chunk in split_message(reply, MESSAGE_LIMIT) {
            last_sent = Some(bot.send_message(msg.chat.id, chunk).await?);
        }
    }

    if let (Some(FollowUp::WakeApi), Some(status)) = (result.follow_up, last_sent) {
        spawn_wake(bot, status, message.user_id, state);
    }

    Ok(())
}

async fn handle_document(
    bot: &Bot,
    msg: &Message,
    document: &Document,
    state: &ChannelState,
) -> ResponseResult<()> {
    let user_id = msg.chat.id.0;
    if !state.dispatcher.accept_upload(user_id) {
        log::debug!("[TELEGRAM] Ignoring PDF from {} (no pending /summary)", user_id);
        return Ok(());
    }

    let data = match download_document(bot, &document.file.id).await {
        Ok(data) => data,
        Err(e) => {
            log::warn!("[TELEGRAM] Failed to download PDF from {}: {}", user_id, e);
            bot.send_message(msg.chat.id, DOWNLOAD_FAILED).await?;
            return Ok(());
        }
    };

    let reply = state.dispatcher.summarize_document(&data).await;
    for chunk in split_message(&reply, MESSAGE_LIMIT) {
        bot.send_message(msg.chat.id, chunk).await?;
    }
    Ok(())
}

/// Look up a file by id and fetch its bytes
async fn download_document(bot: &Bot, file_id: &str) -> Result<Vec<u8>, String> {
    let file = bot.get_file(file_id).await.map_err(|e| e.to_string())?;
    let mut data: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut data)
        .await
        .map_err(|e| e.to_string())?;
    Ok(data)
}

fn is_pdf(document: &Document) -> bool {
    document
        .mime_type
        .as_ref()
        .map(|m| m.essence_str() == PDF_MIME)
        .unwrap_or(false)
}

/// Poll the content API in the background and edit `status` with the result
fn spawn_wake(bot: Bot, status: Message, user_id: UserId, state: Arc<ChannelState>) {
    let ticket = state.wake.begin(user_id);

    tokio::spawn(async move {
        let outcome = state.dispatcher.content().wake(ticket.token()).await;
        state.wake.finish(&ticket);
        log::info!("[TELEGRAM] Wake-up for {} finished: {:?}", user_id, outcome);

        if let Err(e) = bot
            .edit_message_text(status.chat.id, status.id, outcome.message())
            .await
        {
            log::warn!("[TELEGRAM] Failed to update wake-up status for {}: {}", user_id, e);
        }
    });
}

/// Split text into pieces of at most `limit` characters. Empty text yields nothing.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[async_trait]
impl BroadcastSender for Bot {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<(), String> {
        self.send_message(ChatId(user_id), text)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
