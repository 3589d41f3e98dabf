use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Telegram bot token (required)
    pub const BOT_TOKEN: &str = "TOKEN";
    pub const PORT: &str = "PORT";
    pub const NOTES_FILE: &str = "NOTES_FILE";
    pub const SUBSCRIBED_USERS_FILE: &str = "SUBSCRIBED_USERS_FILE";
    /// Base URL of the joke/quote service; `/joke` and `/quote` are appended.
    pub const CONTENT_API_URL: &str = "CONTENT_API_URL";
    /// Six-field cron expression (sec min hour dom mon dow), local time.
    pub const DAILY_QUOTE_CRON: &str = "DAILY_QUOTE_CRON";
    pub const JOKE_WARMUP_MS: &str = "JOKE_WARMUP_MS";
    pub const QUOTE_WARMUP_SECS: &str = "QUOTE_WARMUP_SECS";
    pub const WAKE_MAX_ATTEMPTS: &str = "WAKE_MAX_ATTEMPTS";
    pub const WAKE_INTERVAL_SECS: &str = "WAKE_INTERVAL_SECS";
    pub const SUMMARY_UPLOAD_TTL_SECS: &str = "SUMMARY_UPLOAD_TTL_SECS";
    pub const PDFTOTEXT_TIMEOUT_SECS: &str = "PDFTOTEXT_TIMEOUT_SECS";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const NOTES_FILE: &str = "notes.json";
    pub const SUBSCRIBED_USERS_FILE: &str = "subscribed_users.json";
    pub const CONTENT_API_URL: &str = "https://fluxapi-fssj.onrender.com";
    pub const DAILY_QUOTE_CRON: &str = "0 13 10 * * *";
    pub const JOKE_WARMUP_MS: u64 = 2500;
    pub const QUOTE_WARMUP_SECS: u64 = 120;
    pub const WAKE_PING_TIMEOUT_SECS: u64 = 3;
    pub const REQUEST_TIMEOUT_SECS: u64 = 5;
    pub const WAKE_MAX_ATTEMPTS: u32 = 15;
    pub const WAKE_INTERVAL_SECS: u64 = 5;
    pub const SUMMARY_UPLOAD_TTL_SECS: u64 = 600;
    pub const PDFTOTEXT_TIMEOUT_SECS: u64 = 60;
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Ignoring invalid value for {}: {:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Settings for the external joke/quote service.
#[derive(Clone, Debug)]
pub struct ContentApiConfig {
    pub base_url: String,
    /// Timeout for the throwaway wake-up ping
    pub wake_ping_timeout: Duration,
    /// Timeout for the real request
    pub request_timeout: Duration,
    /// Delay between the wake-up ping and the real `/joke` request
    pub joke_warmup: Duration,
    /// Delay between the wake-up ping and the broadcast `/quote` request
    pub quote_warmup: Duration,
    pub wake_max_attempts: u32,
    pub wake_interval: Duration,
}

impl Default for ContentApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::CONTENT_API_URL.to_string(),
            wake_ping_timeout: Duration::from_secs(defaults::WAKE_PING_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            joke_warmup: Duration::from_millis(defaults::JOKE_WARMUP_MS),
            quote_warmup: Duration::from_secs(defaults::QUOTE_WARMUP_SECS),
            wake_max_attempts: defaults::WAKE_MAX_ATTEMPTS,
            wake_interval: Duration::from_secs(defaults::WAKE_INTERVAL_SECS),
        }
    }
}

impl ContentApiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(env_vars::CONTENT_API_URL)
                .unwrap_or_else(|_| defaults::CONTENT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            joke_warmup: Duration::from_millis(env_or(
                env_vars::JOKE_WARMUP_MS,
                defaults::JOKE_WARMUP_MS,
            )),
            quote_warmup: Duration::from_secs(env_or(
                env_vars::QUOTE_WARMUP_SECS,
                defaults::QUOTE_WARMUP_SECS,
            )),
            wake_max_attempts: env_or(env_vars::WAKE_MAX_ATTEMPTS, defaults::WAKE_MAX_ATTEMPTS),
            wake_interval: Duration::from_secs(env_or(
                env_vars::WAKE_INTERVAL_SECS,
                defaults::WAKE_INTERVAL_SECS,
            )),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: Option<String>,
    pub port: u16,
    pub notes_file: PathBuf,
    pub subscribed_users_file: PathBuf,
    pub daily_quote_cron: String,
    pub summary_upload_ttl: Duration,
    pub pdftotext_timeout: Duration,
    pub content_api: ContentApiConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bot_token: env::var(env_vars::BOT_TOKEN)
                .ok()
                .filter(|t| !t.trim().is_empty()),
            port: env_or(env_vars::PORT, defaults::PORT),
            notes_file: env::var(env_vars::NOTES_FILE)
                .unwrap_or_else(|_| defaults::NOTES_FILE.to_string())
                .into(),
            subscribed_users_file: env::var(env_vars::SUBSCRIBED_USERS_FILE)
                .unwrap_or_else(|_| defaults::SUBSCRIBED_USERS_FILE.to_string())
                .into(),
            daily_quote_cron: env::var(env_vars::DAILY_QUOTE_CRON)
                .unwrap_or_else(|_| defaults::DAILY_QUOTE_CRON.to_string()),
            summary_upload_ttl: Duration::from_secs(env_or(
                env_vars::SUMMARY_UPLOAD_TTL_SECS,
                defaults::SUMMARY_UPLOAD_TTL_SECS,
            )),
            pdftotext_timeout: Duration::from_secs(env_or(
                env_vars::PDFTOTEXT_TIMEOUT_SECS,
                defaults::PDFTOTEXT_TIMEOUT_SECS,
            )),
            content_api: ContentApiConfig::from_env(),
        }
    }
}
