//! In-memory store implementation
//!
//! One `MemoryStore` implements all three seams over a single mutex so
//! tests can exercise the pipeline and lifecycle without Postgres.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedgate_common::types::FetchOutcome;
use feedgate_common::{CandidateRecord, FeedConfig, RecordStatus};
use uuid::Uuid;

use super::{
    Catalog, CatalogError, CatalogMatch, FeedFilter, FeedStore, RecordFilter, RecordStore,
    StatusCounts, StoreError,
};

#[derive(Debug, Clone)]
struct CatalogItem {
    item_code: String,
    fields: BTreeMap<String, String>,
}

#[derive(Default)]
struct Inner {
    feeds: HashMap<Uuid, FeedConfig>,
    records: HashMap<Uuid, CandidateRecord>,
    catalog: HashMap<String, CatalogItem>,
}

/// Shared in-memory state behind all three store traits
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a catalog item
    pub fn add_catalog_item(&self, item_ref: &str, item_code: &str) {
        self.lock().catalog.insert(
            item_ref.to_string(),
            CatalogItem {
                item_code: item_code.to_string(),
                fields: BTreeMap::new(),
            },
        );
    }

    /// Fields currently written on a catalog item, for assertions
    pub fn catalog_fields(&self, item_ref: &str) -> Option<BTreeMap<String, String>> {
        self.lock().catalog.get(item_ref).map(|i| i.fields.clone())
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn list(&self, filter: &FeedFilter) -> Result<Vec<FeedConfig>, StoreError> {
        let inner = self.lock();
        let mut feeds: Vec<FeedConfig> = inner
            .feeds
            .values()
            .filter(|f| {
                filter.supplier.as_ref().is_none_or(|s| &f.supplier == s)
                    && filter.enabled.is_none_or(|e| f.enabled == e)
            })
            .cloned()
            .collect();
        feeds.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(feeds)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FeedConfig>, StoreError> {
        Ok(self.lock().feeds.get(&id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<FeedConfig>, StoreError> {
        FeedStore::list(self, &FeedFilter {
            enabled: Some(true),
            ..FeedFilter::default()
        })
        .await
    }

    async fn insert(&self, feed: &FeedConfig) -> Result<(), StoreError> {
        self.lock().feeds.insert(feed.id, feed.clone());
        Ok(())
    }

    async fn record_outcome(
        &self,
        feed_id: Uuid,
        outcome: &FetchOutcome,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(feed) = inner.feeds.get_mut(&feed_id) {
            if outcome.success {
                feed.last_fetch_at = Some(outcome.finished_at);
            }
            feed.last_outcome = Some(outcome.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError> {
        self.lock().records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError> {
        Ok(self.lock().records.get(&id).cloned())
    }

    async fn find_open(
        &self,
        feed_id: Uuid,
        item_code: &str,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| {
                r.feed_id == feed_id
                    && r.item_code == item_code
                    && r.status == RecordStatus::Pending
            })
            .cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<CandidateRecord>, StoreError> {
        let inner = self.lock();
        let mut records: Vec<CandidateRecord> = inner
            .records
            .values()
            .filter(|r| {
                filter.feed_id.is_none_or(|id| r.feed_id == id)
                    && filter.supplier.as_ref().is_none_or(|s| &r.supplier == s)
                    && filter.status.is_none_or(|st| r.status == st)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let inner = self.lock();
        let mut counts = StatusCounts::default();
        for record in inner.records.values() {
            match record.status {
                RecordStatus::Pending => counts.pending += 1,
                RecordStatus::Approved => counts.approved += 1,
                RecordStatus::Rejected => counts.rejected += 1,
                RecordStatus::Synced => counts.synced += 1,
            }
        }
        Ok(counts)
    }

    async fn refresh_snapshot(
        &self,
        id: Uuid,
        record: &CandidateRecord,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.records.get_mut(&id) {
            Some(existing) if existing.status == RecordStatus::Pending => {
                existing.item_name = record.item_name.clone();
                existing.attributes = record.attributes.clone();
                existing.snapshot_digest = record.snapshot_digest.clone();
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RecordStatus,
        to: RecordStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.records.get_mut(&id) {
            Some(existing) if existing.status == from => {
                existing.status = to;
                existing.decided_by = Some(actor.to_string());
                existing.decided_at = Some(at);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn set_mapped_item(
        &self,
        id: Uuid,
        item_ref: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.records.get_mut(&id) {
            Some(existing) if existing.status != RecordStatus::Synced => {
                existing.mapped_item = item_ref.map(str::to_string);
                if item_ref.is_some() {
                    existing.match_conflict = false;
                }
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn find_item_by_code(&self, code: &str) -> Result<CatalogMatch, StoreError> {
        let inner = self.lock();
        let mut matches: Vec<String> = inner
            .catalog
            .iter()
            .filter(|(_, item)| item.item_code == code)
            .map(|(item_ref, _)| item_ref.clone())
            .collect();
        matches.sort();
        Ok(match matches.len() {
            0 => CatalogMatch::None,
            1 => CatalogMatch::Unique(matches.remove(0)),
            _ => CatalogMatch::Ambiguous(matches),
        })
    }

    async fn item_exists(&self, item_ref: &str) -> Result<bool, StoreError> {
        Ok(self.lock().catalog.contains_key(item_ref))
    }

    async fn write_item_fields(
        &self,
        item_ref: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError> {
        let mut inner = self.lock();
        let item = inner
            .catalog
            .get_mut(item_ref)
            .ok_or_else(|| CatalogError::ItemNotFound(item_ref.to_string()))?;
        item.fields.extend(fields.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedgate_common::types::{CanonicalRow, FieldMap};
    use feedgate_common::FeedFormat;

    fn sample_feed() -> FeedConfig {
        FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme price list".to_string(),
            format: FeedFormat::Csv,
            url: "http://feeds.test/acme.csv".to_string(),
            enabled: true,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        }
    }

    fn sample_record(feed: &FeedConfig, code: &str) -> CandidateRecord {
        let row = CanonicalRow {
            item_code: code.to_string(),
            item_name: "Widget".to_string(),
            attributes: BTreeMap::new(),
        };
        CandidateRecord::from_row(feed, &row, Utc::now())
    }

    #[tokio::test]
    async fn test_find_open_ignores_terminal_records() {
        let store = MemoryStore::default();
        let feed = sample_feed();
        let record = sample_record(&feed, "A1");
        let id = record.id;
        RecordStore::insert(&store, &record).await.unwrap();

        assert!(store.find_open(feed.id, "A1").await.unwrap().is_some());

        assert!(store
            .transition(id, RecordStatus::Pending, RecordStatus::Rejected, "qa", Utc::now())
            .await
            .unwrap());
        assert!(store.find_open(feed.id, "A1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_cas_rejects_wrong_source_status() {
        let store = MemoryStore::default();
        let feed = sample_feed();
        let record = sample_record(&feed, "A1");
        let id = record.id;
        RecordStore::insert(&store, &record).await.unwrap();

        assert!(!store
            .transition(id, RecordStatus::Approved, RecordStatus::Synced, "qa", Utc::now())
            .await
            .unwrap());
        let stored = RecordStore::get(&store, id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_mapped_item_frozen_once_synced() {
        let store = MemoryStore::default();
        let feed = sample_feed();
        let mut record = sample_record(&feed, "A1");
        record.status = RecordStatus::Synced;
        let id = record.id;
        RecordStore::insert(&store, &record).await.unwrap();

        assert!(!store.set_mapped_item(id, Some("ITEM-9")).await.unwrap());
    }

    #[tokio::test]
    async fn test_ambiguous_catalog_match() {
        let store = MemoryStore::default();
        store.add_catalog_item("ITEM-1", "A1");
        store.add_catalog_item("ITEM-2", "A1");

        let matched = store.find_item_by_code("A1").await.unwrap();
        assert_eq!(
            matched,
            CatalogMatch::Ambiguous(vec!["ITEM-1".to_string(), "ITEM-2".to_string()])
        );
    }

    #[tokio::test]
    async fn test_record_outcome_advances_last_fetch_only_on_success() {
        let store = MemoryStore::default();
        let feed = sample_feed();
        FeedStore::insert(&store, &feed).await.unwrap();

        let failed = FetchOutcome::failure("fetch_timeout", Utc::now());
        store.record_outcome(feed.id, &failed).await.unwrap();
        let stored = FeedStore::get(&store, feed.id).await.unwrap().unwrap();
        assert!(stored.last_fetch_at.is_none());
        assert!(stored.last_outcome.is_some());

        let ok = FetchOutcome {
            success: true,
            reason: None,
            created: 1,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            finished_at: Utc::now(),
        };
        store.record_outcome(feed.id, &ok).await.unwrap();
        let stored = FeedStore::get(&store, feed.id).await.unwrap().unwrap();
        assert!(stored.last_fetch_at.is_some());
    }
}
