//! Feed ingestion pipeline
//!
//! One run is fetch, parse, reconcile, record outcome, always under the
//! feed's run lock. Fetch and parse failures are not errors at this level;
//! they become a failed `FetchOutcome` with a reason code so the feed
//! configuration carries the history of what happened.

pub mod locks;
pub mod reconciler;
pub mod scheduler;

use chrono::Utc;
use feedgate_common::types::FetchOutcome;
use feedgate_common::FeedConfig;
use feedgate_ingest::fetch::{FeedFetcher, FetchConfig, FetchError};
use feedgate_ingest::parser::decode_feed;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{StoreError, Stores};

pub use locks::{FeedLockGuard, FeedLocks};
pub use reconciler::{reconcile, ReconcileSummary};
pub use scheduler::Scheduler;

/// Errors surfaced to callers triggering a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Feed {0} not found")]
    NotFound(Uuid),

    #[error("Feed {0} is disabled")]
    Disabled(Uuid),

    #[error("Feed {0} already has a run in flight")]
    Busy(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fetch, parse and reconcile runs for all feeds
pub struct Pipeline {
    pub(crate) stores: Stores,
    fetcher: FeedFetcher,
    pub(crate) locks: FeedLocks,
}

impl Pipeline {
    pub fn new(stores: Stores, fetch: FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            stores,
            fetcher: FeedFetcher::new(fetch)?,
            locks: FeedLocks::new(),
        })
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Run one feed immediately, outside the schedule
    #[tracing::instrument(skip(self), fields(feed_id = %feed_id))]
    pub async fn fetch_now(&self, feed_id: Uuid) -> Result<FetchOutcome, PipelineError> {
        let feed = self
            .stores
            .feeds
            .get(feed_id)
            .await?
            .ok_or(PipelineError::NotFound(feed_id))?;
        if !feed.enabled {
            return Err(PipelineError::Disabled(feed_id));
        }
        let guard = self
            .locks
            .try_acquire(feed_id)
            .ok_or(PipelineError::Busy(feed_id))?;

        Ok(self.run_locked(&feed, guard).await?)
    }

    /// Run a feed whose lock the caller already holds, and record the
    /// outcome before the lock is released.
    pub(crate) async fn run_locked(
        &self,
        feed: &FeedConfig,
        guard: FeedLockGuard,
    ) -> Result<FetchOutcome, StoreError> {
        let outcome = self.run_feed(feed).await?;
        self.stores.feeds.record_outcome(feed.id, &outcome).await?;
        drop(guard);

        if outcome.success {
            tracing::info!(
                feed_id = %feed.id,
                created = outcome.created,
                updated = outcome.updated,
                unchanged = outcome.unchanged,
                skipped = outcome.skipped,
                "Feed run finished"
            );
        } else {
            tracing::warn!(
                feed_id = %feed.id,
                reason = outcome.reason.as_deref().unwrap_or("unknown"),
                "Feed run failed"
            );
        }
        Ok(outcome)
    }

    async fn run_feed(&self, feed: &FeedConfig) -> Result<FetchOutcome, StoreError> {
        let bytes = match self.fetcher.fetch(&feed.url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(feed_id = %feed.id, error = %err, "Fetch failed");
                return Ok(FetchOutcome::failure(err.reason_code(), Utc::now()));
            },
        };

        let decoded = match decode_feed(feed.format, &bytes, &feed.field_map) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(feed_id = %feed.id, error = %err, "Parse failed");
                return Ok(FetchOutcome::failure("parse_error", Utc::now()));
            },
        };

        let summary = reconcile(&self.stores, feed, &decoded.rows).await?;

        Ok(FetchOutcome {
            success: true,
            reason: None,
            created: summary.created,
            updated: summary.updated,
            unchanged: summary.unchanged,
            skipped: decoded.skipped,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedgate_common::types::{FeedFormat, FieldMap};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn pipeline_with_feed(body: &str) -> (Pipeline, FeedConfig, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let feed = FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme price list".to_string(),
            format: FeedFormat::Csv,
            url: format!("{}/feed.csv", server.uri()),
            enabled: true,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        };

        let stores = Stores::in_memory();
        stores.feeds.insert(&feed).await.unwrap();
        let pipeline = Pipeline::new(stores, FetchConfig::default()).unwrap();
        (pipeline, feed, server)
    }

    #[tokio::test]
    async fn test_fetch_now_creates_records_and_records_outcome() {
        let (pipeline, feed, _server) = pipeline_with_feed("code,name,price\nA1,Widget,9.99\n").await;

        let outcome = pipeline.fetch_now(feed.id).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.created, 1);
        let stored = pipeline.stores.feeds.get(feed.id).await.unwrap().unwrap();
        assert!(stored.last_fetch_at.is_some());
        assert_eq!(stored.last_outcome, Some(outcome));
    }

    #[tokio::test]
    async fn test_fetch_now_unknown_feed() {
        let stores = Stores::in_memory();
        let pipeline = Pipeline::new(stores, FetchConfig::default()).unwrap();

        let err = pipeline.fetch_now(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_now_disabled_feed() {
        let (pipeline, mut feed, _server) = pipeline_with_feed("code,name\nA1,W\n").await;
        feed.enabled = false;
        pipeline.stores.feeds.insert(&feed).await.unwrap();

        let err = pipeline.fetch_now(feed.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Disabled(_)));
    }

    #[tokio::test]
    async fn test_fetch_now_busy_while_lock_held() {
        let (pipeline, feed, _server) = pipeline_with_feed("code,name\nA1,W\n").await;

        let _guard = pipeline.locks.try_acquire(feed.id).unwrap();
        let err = pipeline.fetch_now(feed.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Busy(_)));
    }

    #[tokio::test]
    async fn test_parse_failure_becomes_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let feed = FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme JSON".to_string(),
            format: FeedFormat::Json,
            url: format!("{}/feed.json", server.uri()),
            enabled: true,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        };
        let stores = Stores::in_memory();
        stores.feeds.insert(&feed).await.unwrap();
        let pipeline = Pipeline::new(stores, FetchConfig::default()).unwrap();

        let outcome = pipeline.fetch_now(feed.id).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("parse_error"));
        // A failed run leaves the feed due
        let stored = pipeline.stores.feeds.get(feed.id).await.unwrap().unwrap();
        assert!(stored.last_fetch_at.is_none());
    }

    #[tokio::test]
    async fn test_skipped_rows_still_count_as_success() {
        let (pipeline, feed, _server) =
            pipeline_with_feed("code,name\nA1,WidgetA\n,NoCode\n").await;

        let outcome = pipeline.fetch_now(feed.id).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 1);
        // Partial success advances the feed like any other success
        let stored = pipeline.stores.feeds.get(feed.id).await.unwrap().unwrap();
        assert!(stored.last_fetch_at.is_some());
        assert_eq!(stored.last_outcome.as_ref().map(|o| o.skipped), Some(1));
    }

    #[tokio::test]
    async fn test_fetch_failure_reason_code_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let feed = FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme gone".to_string(),
            format: FeedFormat::Csv,
            url: format!("{}/feed.csv", server.uri()),
            enabled: true,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        };
        let stores = Stores::in_memory();
        stores.feeds.insert(&feed).await.unwrap();
        let pipeline = Pipeline::new(stores, FetchConfig::default()).unwrap();

        let outcome = pipeline.fetch_now(feed.id).await.unwrap();

        assert!(!outcome.success);
        assert!(outcome.reason.is_some());
    }
}
