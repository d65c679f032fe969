//! Feed retrieval over HTTP
//!
//! One fetch returns the raw feed bytes for a configured source URL.
//! Transient failures (timeout, connection errors, 5xx, 429) are retried
//! with exponential backoff up to a fixed attempt count; permanent failures
//! (other 4xx, auth rejection, malformed URL) propagate immediately. The
//! fetcher never touches feed state — recording the run outcome is the
//! caller's job.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts for transient failures.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit in milliseconds (doubled per attempt).
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Fetch failure, split into transient and permanent kinds
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("malformed feed URL: {0}")]
    InvalidUrl(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("source rejected the request (HTTP {status})")]
    Rejected { status: u16 },

    #[error("upstream failure (HTTP {status})")]
    Upstream { status: u16 },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Transient errors are retried by the fetcher itself
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout
                | FetchError::Connect(_)
                | FetchError::Upstream { .. }
                | FetchError::Body(_)
        )
    }

    /// Short reason code for run-outcome reporting
    pub fn reason_code(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl(_) => "fetch_invalid_url",
            FetchError::Timeout => "fetch_timeout",
            FetchError::Connect(_) => "fetch_connect",
            FetchError::Auth { .. } => "fetch_auth",
            FetchError::Rejected { .. } => "fetch_rejected",
            FetchError::Upstream { .. } => "fetch_upstream",
            FetchError::Body(_) => "fetch_body",
            FetchError::Client(_) => "fetch_client",
        }
    }
}

/// Fetcher tuning knobs
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

/// HTTP client for downloading supplier feeds
pub struct FeedFetcher {
    client: Client,
    config: FetchConfig,
}

impl FeedFetcher {
    /// Create a new fetcher with the given configuration
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("feedgate-ingest/0.1")
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Download the feed at `url`, retrying transient failures
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut attempt = 0u32;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    info!(url = %url, bytes = bytes.len(), attempt, "Feed downloaded");
                    return Ok(bytes);
                },
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        url = %url,
                        attempt,
                        error = %e,
                        "Transient fetch failure, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                },
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Fetch failed");
                    return Err(e);
                },
            }
        }
    }

    /// Backoff before retry attempt `attempt`: backoff_ms * 2^attempt,
    /// saturating so a large configured attempt count cannot overflow.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.config.backoff_ms.saturating_mul(factor))
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = %url, "Requesting feed");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::Connect(e.to_string())
            } else {
                FetchError::Client(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| FetchError::Body(e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Auth {
                status: status.as_u16(),
            },
            // Rate limiting is worth another attempt; other 4xx are not
            StatusCode::TOO_MANY_REQUESTS => FetchError::Upstream {
                status: status.as_u16(),
            },
            s if s.is_client_error() => FetchError::Rejected {
                status: status.as_u16(),
            },
            s => FetchError::Upstream {
                status: s.as_u16(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(max_attempts: u32) -> FeedFetcher {
        FeedFetcher::new(FetchConfig {
            timeout_secs: 2,
            max_attempts,
            backoff_ms: 10,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("code,name\nA1,WidgetA\n"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(3);
        let bytes = fetcher
            .fetch(&format!("{}/feed.csv", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"code,name\nA1,WidgetA\n");
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(3);
        let bytes = fetcher
            .fetch(&format!("{}/feed.csv", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"ok");
    }

    #[tokio::test]
    async fn test_transient_failure_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(2);
        let err = fetcher
            .fetch(&format!("{}/feed.csv", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Upstream { status: 500 }));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(3);
        let err = fetcher
            .fetch(&format!("{}/feed.csv", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Rejected { status: 404 }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_auth_rejection_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(3);
        let err = fetcher
            .fetch(&format!("{}/feed.csv", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Auth { status: 401 }));
    }

    #[tokio::test]
    async fn test_malformed_url_fails_immediately() {
        let fetcher = test_fetcher(3);
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));

        let err = fetcher.fetch("ftp://feeds.example.com/a.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let fetcher = test_fetcher(3);
        assert_eq!(fetcher.backoff(0), Duration::from_millis(10));
        assert_eq!(fetcher.backoff(1), Duration::from_millis(20));
        assert_eq!(fetcher.backoff(2), Duration::from_millis(40));
    }

    #[test]
    fn test_backoff_saturates_on_large_attempt_counts() {
        let fetcher = test_fetcher(200);
        assert_eq!(fetcher.backoff(63), Duration::from_millis(u64::MAX));
        assert_eq!(fetcher.backoff(64), Duration::from_millis(u64::MAX));
        assert_eq!(fetcher.backoff(u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.csv"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = FeedFetcher::new(FetchConfig {
            timeout_secs: 1,
            max_attempts: 1,
            backoff_ms: 10,
        })
        .unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow.csv", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
        assert!(err.is_transient());
    }
}
