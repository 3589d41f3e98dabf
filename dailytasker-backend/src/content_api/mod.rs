//! Typed HTTP client for the joke/quote content service.
//!
//! The service sleeps when idle, so every fetch first fires a throwaway
//! request with a short timeout, waits a fixed warm-up delay, and only then
//! sends the real request.

mod wake;

pub use wake::{WakeOutcome, WakeSupervisor};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ContentApiConfig;

pub const JOKE_FALLBACK: &str = "No joke found.";
pub const QUOTE_FALLBACK: &str = "Stay motivated!";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content API answered HTTP {0}")]
    Unavailable(StatusCode),

    #[error("content API request failed: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct JokeBody {
    #[serde(default)]
    joke: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    quote: Option<String>,
}

pub struct ContentApiClient {
    config: ContentApiConfig,
    client: reqwest::Client,
}

impl ContentApiClient {
    pub fn new(config: ContentApiConfig) -> Self {
        Self {
            config: ContentApiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: reqwest::Client::new(),
        }
    }

    fn joke_url(&self) -> String {
        format!("{}/joke", self.config.base_url)
    }

    fn quote_url(&self) -> String {
        format!("{}/quote", self.config.base_url)
    }

    /// Fetch a joke for an interactive request
    pub async fn fetch_joke(&self) -> Result<String, ContentError> {
        let body: JokeBody = self
            .warm_fetch(&self.joke_url(), self.config.joke_warmup)
            .await?;
        Ok(body.joke.unwrap_or_else(|| JOKE_FALLBACK.to_string()))
    }

    /// Fetch the quote of the day (uses the long broadcast warm-up)
    pub async fn fetch_quote(&self) -> Result<String, ContentError> {
        let body: QuoteBody = self
            .warm_fetch(&self.quote_url(), self.config.quote_warmup)
            .await?;
        Ok(body.quote.unwrap_or_else(|| QUOTE_FALLBACK.to_string()))
    }

    async fn warm_fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        warmup: Duration,
    ) -> Result<T, ContentError> {
        // Wake-up ping; the outcome does not matter
        if let Err(e) = self
            .client
            .get(url)
            .timeout(self.config.wake_ping_timeout)
            .send()
            .await
        {
            log::debug!("[CONTENT_API] Wake-up ping to {} failed: {}", url, e);
        }

        if !warmup.is_zero() {
            tokio::time::sleep(warmup).await;
        }

        let resp = self
            .client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            log::warn!("[CONTENT_API] {} answered HTTP {}", url, status);
            return Err(ContentError::Unavailable(status));
        }

        Ok(resp.json::<T>().await?)
    }

    /// Poll the joke endpoint until it answers 200, the attempt budget runs
    /// out, or `cancel` fires.
    pub async fn wake(&self, cancel: &CancellationToken) -> WakeOutcome {
        let url = self.joke_url();
        let max_attempts = self.config.wake_max_attempts.max(1);
        let mut any_response = false;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let request = self
                .client
                .get(&url)
                .timeout(self.config.request_timeout)
                .send();

            let result = tokio::select! {
                _ = cancel.cancelled() => return WakeOutcome::Cancelled,
                result = request => result,
            };

            match result {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    log::info!("[CONTENT_API] API awake after {} attempt(s)", attempt);
                    return WakeOutcome::Awake { attempts: attempt };
                }
                Ok(resp) => {
                    any_response = true;
                    log::debug!(
                        "[CONTENT_API] Wake attempt {}/{}: HTTP {}",
                        attempt,
                        max_attempts,
                        resp.status()
                    );
                }
                Err(e) => {
                    log::debug!(
                        "[CONTENT_API] Wake attempt {}/{} failed: {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return WakeOutcome::Cancelled,
                    _ = tokio::time::sleep(self.config.wake_interval) => {}
                }
            }
        }

        if any_response {
            WakeOutcome::TimedOut
        } else {
            WakeOutcome::Unreachable(last_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> ContentApiConfig {
        ContentApiConfig {
            base_url: base_url.to_string(),
            wake_ping_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(2),
            joke_warmup: Duration::ZERO,
            quote_warmup: Duration::ZERO,
            wake_max_attempts: 3,
            wake_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_fetch_joke_pings_then_fetches() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "joke": "Why did the crab never share?" })),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = ContentApiClient::new(test_config(&format!("{}/", mock_server.uri())));
        let joke = client.fetch_joke().await.unwrap();
        assert_eq!(joke, "Why did the crab never share?");
    }

    #[tokio::test]
    async fn test_missing_field_uses_fallback() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = ContentApiClient::new(test_config(&mock_server.uri()));
        assert_eq!(client.fetch_quote().await.unwrap(), QUOTE_FALLBACK);
    }

    #[tokio::test]
    async fn test_non_200_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = ContentApiClient::new(test_config(&mock_server.uri()));
        let err = client.fetch_joke().await.unwrap_err();
        assert!(matches!(err, ContentError::Unavailable(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) is essentially never listening on localhost
        let client = ContentApiClient::new(test_config("http://127.0.0.1:9"));
        let err = client.fetch_quote().await.unwrap_err();
        assert!(matches!(err, ContentError::Network(_)));
    }

    #[tokio::test]
    async fn test_wake_succeeds_once_api_answers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = ContentApiClient::new(test_config(&mock_server.uri()));
        let outcome = client.wake(&CancellationToken::new()).await;
        assert_eq!(outcome, WakeOutcome::Awake { attempts: 2 });
    }

    #[tokio::test]
    async fn test_wake_gives_up_after_max_attempts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = ContentApiClient::new(test_config(&mock_server.uri()));
        let outcome = client.wake(&CancellationToken::new()).await;
        assert_eq!(outcome, WakeOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_wake_unreachable() {
        let client = ContentApiClient::new(test_config("http://127.0.0.1:9"));
        let outcome = client.wake(&CancellationToken::new()).await;
        assert!(matches!(outcome, WakeOutcome::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_wake_cancelled() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let mut config = test_config(&mock_server.uri());
        config.wake_max_attempts = 100;
        config.wake_interval = Duration::from_secs(30);
        let client = ContentApiClient::new(config);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = client.wake(&cancel).await;
        assert_eq!(outcome, WakeOutcome::Cancelled);
    }
}
