use actix_web::{middleware::Logger, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod channels;
mod config;
mod content_api;
mod controllers;
mod documents;
mod notes;
mod scheduler;
mod sessions;
mod storage;
mod subscriptions;

use channels::{CommandDispatcher, TelegramChannel};
use config::Config;
use content_api::{ContentApiClient, WakeSupervisor};
use notes::NoteStore;
use scheduler::Scheduler;
use sessions::PendingUploads;
use subscriptions::SubscriptionStore;

/// Chat identifier (Telegram chat id)
pub type UserId = i64;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("DailyTasker v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let Some(bot_token) = config.bot_token.clone() else {
        log::error!("{} is not set; cannot start the Telegram bot", config::env_vars::BOT_TOKEN);
        std::process::exit(1);
    };

    let notes = Arc::new(NoteStore::new(config.notes_file.clone()));
    let subscriptions = Arc::new(SubscriptionStore::new(config.subscribed_users_file.clone()));
    let content = Arc::new(ContentApiClient::new(config.content_api.clone()));
    let uploads = Arc::new(PendingUploads::new(config.summary_upload_ttl));
    let wake = Arc::new(WakeSupervisor::new());

    let dispatcher = Arc::new(CommandDispatcher::new(
        notes,
        subscriptions.clone(),
        content.clone(),
        uploads,
        config.pdftotext_timeout,
    ));

    log::info!("Initializing Telegram channel");
    let telegram = TelegramChannel::new(&bot_token, dispatcher, wake.clone());
    let bot = telegram.bot();
    let (telegram_handle, telegram_shutdown) = telegram.start();

    log::info!("Initializing scheduler ({})", config.daily_quote_cron);
    let scheduler = match Scheduler::new(
        &config.daily_quote_cron,
        subscriptions,
        content,
        Arc::new(bot),
    ) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Some(next) = scheduler.next_run() {
        log::info!("First daily quote broadcast at {}", next);
    }

    let scheduler_handle = Arc::clone(&scheduler);
    let (scheduler_shutdown_tx, scheduler_shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        scheduler_handle.start(scheduler_shutdown_rx).await;
    });

    let port = config.port;
    log::info!("Keep-alive server listening on 0.0.0.0:{}", port);
    let server = HttpServer::new(|| {
        App::new()
            .wrap(Logger::default())
            .configure(controllers::health::config_routes)
    })
    .workers(1)
    .bind(("0.0.0.0", port))?
    .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    // Spawn Ctrl+C handler
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        // Abandon in-flight /wake polls
        log::info!("Cancelling {} wake-up poll(s)", wake.active());
        wake.cancel_all();

        log::info!("Stopping Telegram dispatcher...");
        match telegram_shutdown.shutdown() {
            Ok(stopped) => {
                if tokio::time::timeout(std::time::Duration::from_secs(5), stopped).await.is_err() {
                    log::warn!("Timeout waiting for Telegram dispatcher to stop, continuing shutdown...");
                }
            }
            Err(_) => log::warn!("Telegram dispatcher was not running"),
        }
        telegram_handle.abort();

        // Signal scheduler to stop
        let _ = scheduler_shutdown_tx.send(());

        log::info!("Stopping HTTP server...");
        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop).await.is_err() {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
