//! Interval scheduler
//!
//! A background loop that scans enabled feed configurations each tick and
//! runs the due ones. Due means never fetched, or the fetch interval has
//! elapsed since the last successful run. A feed whose lock is held is
//! skipped, never queued behind the run in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::Pipeline;
use crate::config::SchedulerConfig;
use crate::store::StoreError;

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: SchedulerConfig) -> Self {
        Self { pipeline, config }
    }

    /// One scheduling pass. Returns the number of feeds that started a
    /// run this tick; runs complete before the tick returns.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let feeds = self.pipeline.stores.feeds.list_enabled().await?;

        let mut runs = Vec::new();
        for feed in feeds {
            if !feed.is_due(now) {
                continue;
            }
            let Some(guard) = self.pipeline.locks.try_acquire(feed.id) else {
                tracing::debug!(feed_id = %feed.id, "Run in flight, skipping this tick");
                continue;
            };
            let pipeline = Arc::clone(&self.pipeline);
            runs.push(async move {
                if let Err(err) = pipeline.run_locked(&feed, guard).await {
                    tracing::error!(feed_id = %feed.id, error = %err, "Feed run aborted");
                }
            });
        }

        let started = runs.len();
        if started > 0 {
            tracing::info!(count = started, "Running due feeds");
        }
        futures::future::join_all(runs).await;

        Ok(started)
    }

    /// Drive ticks at the configured interval until the task is aborted
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let startup_delay = Duration::from_secs(self.config.startup_delay_secs);
        let interval = Duration::from_secs(self.config.tick_interval_secs);

        tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Feed scheduler started"
            );
            loop {
                if let Err(err) = self.tick().await {
                    tracing::error!(error = %err, "Scheduler tick failed");
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedgate_common::types::{FeedFormat, FieldMap};
    use feedgate_common::{FeedConfig, RecordStatus};
    use feedgate_ingest::fetch::FetchConfig;
    use crate::store::{RecordFilter, Stores};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed(url: String, enabled: bool) -> FeedConfig {
        FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme price list".to_string(),
            format: FeedFormat::Csv,
            url,
            enabled,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        }
    }

    async fn mock_feed_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.csv"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("code,name,price\nA1,Widget,9.99\n"),
            )
            .mount(&server)
            .await;
        server
    }

    fn scheduler(stores: Stores) -> Scheduler {
        let pipeline = Arc::new(Pipeline::new(stores, FetchConfig::default()).unwrap());
        Scheduler::new(
            pipeline,
            SchedulerConfig {
                enabled: true,
                tick_interval_secs: 60,
                startup_delay_secs: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_tick_runs_due_feed_and_creates_records() {
        let server = mock_feed_server().await;
        let stores = Stores::in_memory();
        let feed = feed(format!("{}/feed.csv", server.uri()), true);
        stores.feeds.insert(&feed).await.unwrap();

        let scheduler = scheduler(stores.clone());
        let started = scheduler.tick().await.unwrap();

        assert_eq!(started, 1);
        let records = stores
            .records
            .list(&RecordFilter {
                feed_id: Some(feed.id),
                ..RecordFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_tick_skips_disabled_feeds() {
        let server = mock_feed_server().await;
        let stores = Stores::in_memory();
        let feed = feed(format!("{}/feed.csv", server.uri()), false);
        stores.feeds.insert(&feed).await.unwrap();

        let started = scheduler(stores).tick().await.unwrap();
        assert_eq!(started, 0);
    }

    #[tokio::test]
    async fn test_tick_skips_feeds_not_yet_due() {
        let server = mock_feed_server().await;
        let stores = Stores::in_memory();
        let mut config = feed(format!("{}/feed.csv", server.uri()), true);
        config.last_fetch_at = Some(Utc::now());
        stores.feeds.insert(&config).await.unwrap();

        let started = scheduler(stores).tick().await.unwrap();
        assert_eq!(started, 0);
    }

    #[tokio::test]
    async fn test_tick_skips_feed_with_run_in_flight() {
        let server = mock_feed_server().await;
        let stores = Stores::in_memory();
        let config = feed(format!("{}/feed.csv", server.uri()), true);
        stores.feeds.insert(&config).await.unwrap();

        let pipeline = Arc::new(Pipeline::new(stores, FetchConfig::default()).unwrap());
        let _guard = pipeline.locks.try_acquire(config.id).unwrap();
        let scheduler = Scheduler::new(
            Arc::clone(&pipeline),
            SchedulerConfig {
                enabled: true,
                tick_interval_secs: 60,
                startup_delay_secs: 0,
            },
        );

        let started = scheduler.tick().await.unwrap();
        assert_eq!(started, 0);
    }

    #[tokio::test]
    async fn test_back_to_back_ticks_are_idempotent() {
        let server = mock_feed_server().await;
        let stores = Stores::in_memory();
        let mut config = feed(format!("{}/feed.csv", server.uri()), true);
        config.fetch_interval_secs = 0;
        stores.feeds.insert(&config).await.unwrap();

        let scheduler = scheduler(stores.clone());
        scheduler.tick().await.unwrap();
        scheduler.tick().await.unwrap();

        let records = stores.records.list(&RecordFilter::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        let stored = stores.feeds.get(config.id).await.unwrap().unwrap();
        let outcome = stored.last_outcome.unwrap();
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.unchanged, 1);
    }
}
