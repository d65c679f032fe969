//! Persistence and catalog collaborators
//!
//! The pipeline and the lifecycle commands talk to three seams: feed
//! configurations, candidate records and the item catalog. Each seam is a
//! trait with a Postgres implementation for the server and an in-memory
//! implementation for tests.
//!
//! Candidate-record mutation is compare-and-set keyed on the current
//! status: `refresh_snapshot`, `transition` and `set_mapped_item` return
//! `Ok(false)` when the row was not in the expected state, and the caller
//! decides what that means (an invalid transition, or an unchanged row).

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedgate_common::types::FetchOutcome;
use feedgate_common::{CandidateRecord, FeedConfig, RecordStatus};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::{PgCatalog, PgFeedStore, PgRecordStore};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

/// Errors from catalog writes
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog item '{0}' not found")]
    ItemNotFound(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of an exact item-code lookup in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogMatch {
    /// No catalog item carries this code
    None,
    /// Exactly one item carries this code
    Unique(String),
    /// More than one item carries this code
    Ambiguous(Vec<String>),
}

/// Filter for feed configuration listings
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct FeedFilter {
    pub supplier: Option<String>,
    pub enabled: Option<bool>,
}

/// Filter for candidate record listings
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RecordFilter {
    pub feed_id: Option<Uuid>,
    pub supplier: Option<String>,
    pub status: Option<RecordStatus>,
}

/// Record counts grouped by status
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub synced: i64,
}

/// Feed configuration persistence
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn list(&self, filter: &FeedFilter) -> Result<Vec<FeedConfig>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<FeedConfig>, StoreError>;

    /// Enabled configurations, candidates for scheduling
    async fn list_enabled(&self) -> Result<Vec<FeedConfig>, StoreError>;

    async fn insert(&self, feed: &FeedConfig) -> Result<(), StoreError>;

    /// Record the outcome of a pipeline run. `last_fetch_at` advances only
    /// on success so a failed feed stays due.
    async fn record_outcome(&self, feed_id: Uuid, outcome: &FetchOutcome)
        -> Result<(), StoreError>;
}

/// Candidate record persistence
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError>;

    /// The open (pending) record for a feed/item-code pair, if any.
    /// Terminal records for the same key are invisible here.
    async fn find_open(
        &self,
        feed_id: Uuid,
        item_code: &str,
    ) -> Result<Option<CandidateRecord>, StoreError>;

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<CandidateRecord>, StoreError>;

    async fn status_counts(&self) -> Result<StatusCounts, StoreError>;

    /// Replace the snapshot of a record that is still pending. Returns
    /// false when the record was decided in the meantime.
    async fn refresh_snapshot(
        &self,
        id: Uuid,
        record: &CandidateRecord,
    ) -> Result<bool, StoreError>;

    /// Move a record from one status to another, stamping the decision
    /// fields. Returns false when the record was not in `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: RecordStatus,
        to: RecordStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Set or clear the mapped catalog item on a record that is not yet
    /// synced. Clears the match-conflict flag when a mapping is set.
    async fn set_mapped_item(
        &self,
        id: Uuid,
        item_ref: Option<&str>,
    ) -> Result<bool, StoreError>;
}

/// Item catalog collaborator
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Exact lookup by supplier item code, used for mapping suggestions
    async fn find_item_by_code(&self, code: &str) -> Result<CatalogMatch, StoreError>;

    async fn item_exists(&self, item_ref: &str) -> Result<bool, StoreError>;

    /// Write the item name and attribute snapshot onto a catalog item
    async fn write_item_fields(
        &self,
        item_ref: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError>;
}

/// Bundle of store handles passed through the feature routes and pipeline
#[derive(Clone)]
pub struct Stores {
    pub feeds: Arc<dyn FeedStore>,
    pub records: Arc<dyn RecordStore>,
    pub catalog: Arc<dyn Catalog>,
}

impl Stores {
    /// Stores backed by a single Postgres pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            feeds: Arc::new(PgFeedStore::new(pool.clone())),
            records: Arc::new(PgRecordStore::new(pool.clone())),
            catalog: Arc::new(PgCatalog::new(pool)),
        }
    }

    /// In-memory stores sharing one state, for tests
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            feeds: store.clone(),
            records: store.clone(),
            catalog: store,
        }
    }
}
