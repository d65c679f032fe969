//! Link catalog item command
//!
//! Sets (or clears) the catalog item a record will sync to. The mapping
//! can change at any point before the record is synced; afterwards it is
//! immutable. Setting a mapping clears the ambiguous-match flag.

use feedgate_common::{CandidateRecord, RecordStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::store::{StoreError, Stores};

#[derive(Debug, Clone, Deserialize)]
pub struct LinkItemCommand {
    #[serde(skip)]
    pub id: Uuid,
    /// Catalog item reference, or null to clear the mapping
    pub item: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkItemError {
    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error("Catalog item '{0}' not found")]
    ItemNotFound(String),

    #[error("Record is synced, its mapping is immutable")]
    MappingImmutable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(
    stores: &Stores,
    command: LinkItemCommand,
) -> Result<CandidateRecord, LinkItemError> {
    let record = stores
        .records
        .get(command.id)
        .await?
        .ok_or(LinkItemError::NotFound(command.id))?;
    if record.status == RecordStatus::Synced {
        return Err(LinkItemError::MappingImmutable);
    }

    if let Some(item) = &command.item {
        if !stores.catalog.item_exists(item).await? {
            return Err(LinkItemError::ItemNotFound(item.clone()));
        }
    }

    if !stores
        .records
        .set_mapped_item(command.id, command.item.as_deref())
        .await?
    {
        // Synced between the read and the update
        return Err(LinkItemError::MappingImmutable);
    }

    tracing::info!(
        record_id = %command.id,
        item = command.item.as_deref().unwrap_or("<cleared>"),
        "Record mapping updated"
    );

    stores
        .records
        .get(command.id)
        .await?
        .ok_or(LinkItemError::NotFound(command.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feedgate_common::types::{CanonicalRow, FeedFormat, FieldMap};
    use feedgate_common::FeedConfig;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::store::MemoryStore;

    fn stores_with_memory() -> (Stores, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::default());
        let stores = Stores {
            feeds: memory.clone(),
            records: memory.clone(),
            catalog: memory.clone(),
        };
        (stores, memory)
    }

    async fn record_with_status(stores: &Stores, status: RecordStatus) -> CandidateRecord {
        let feed = FeedConfig {
            id: Uuid::new_v4(),
            supplier: "acme".to_string(),
            name: "Acme prices".to_string(),
            format: FeedFormat::Csv,
            url: "http://feeds.test/feed.csv".to_string(),
            enabled: true,
            fetch_interval_secs: 3600,
            last_fetch_at: None,
            last_outcome: None,
            field_map: FieldMap::default(),
        };
        let row = CanonicalRow {
            item_code: "A1".to_string(),
            item_name: "Widget".to_string(),
            attributes: BTreeMap::new(),
        };
        let mut record = CandidateRecord::from_row(&feed, &row, Utc::now());
        record.status = status;
        stores.records.insert(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_link_existing_item() {
        let (stores, memory) = stores_with_memory();
        memory.add_catalog_item("ITEM-001", "A1");
        let record = record_with_status(&stores, RecordStatus::Pending).await;

        let linked = handle(
            &stores,
            LinkItemCommand { id: record.id, item: Some("ITEM-001".to_string()) },
        )
        .await
        .unwrap();

        assert_eq!(linked.mapped_item.as_deref(), Some("ITEM-001"));
    }

    #[tokio::test]
    async fn test_link_unknown_item_is_rejected() {
        let (stores, _memory) = stores_with_memory();
        let record = record_with_status(&stores, RecordStatus::Pending).await;

        let err = handle(
            &stores,
            LinkItemCommand { id: record.id, item: Some("NOPE".to_string()) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LinkItemError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_link_clears_match_conflict() {
        let (stores, memory) = stores_with_memory();
        memory.add_catalog_item("ITEM-001", "A1");
        let mut record = record_with_status(&stores, RecordStatus::Pending).await;
        record.match_conflict = true;
        stores.records.insert(&record).await.unwrap();

        let linked = handle(
            &stores,
            LinkItemCommand { id: record.id, item: Some("ITEM-001".to_string()) },
        )
        .await
        .unwrap();

        assert!(!linked.match_conflict);
    }

    #[tokio::test]
    async fn test_synced_record_mapping_is_immutable() {
        let (stores, memory) = stores_with_memory();
        memory.add_catalog_item("ITEM-001", "A1");
        let record = record_with_status(&stores, RecordStatus::Synced).await;

        let err = handle(
            &stores,
            LinkItemCommand { id: record.id, item: Some("ITEM-001".to_string()) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LinkItemError::MappingImmutable));
    }

    #[tokio::test]
    async fn test_clearing_mapping_skips_catalog_lookup() {
        let (stores, _memory) = stores_with_memory();
        let mut record = record_with_status(&stores, RecordStatus::Pending).await;
        record.mapped_item = Some("ITEM-001".to_string());
        stores.records.insert(&record).await.unwrap();

        let cleared = handle(&stores, LinkItemCommand { id: record.id, item: None })
            .await
            .unwrap();

        assert!(cleared.mapped_item.is_none());
    }
}
