//! Postgres store implementations
//!
//! Row structs mirror the table shapes; JSONB columns carry the attribute
//! maps and the last run outcome. Status-keyed updates express the
//! compare-and-set contract directly in the `WHERE` clause, so races are
//! settled by the database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedgate_common::types::{FetchOutcome, FieldMap};
use feedgate_common::{CandidateRecord, FeedConfig, RecordStatus};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

use super::{
    Catalog, CatalogError, CatalogMatch, FeedFilter, FeedStore, RecordFilter, RecordStore,
    StatusCounts, StoreError,
};

const FEED_COLUMNS: &str = "id, supplier, name, format, url, enabled, fetch_interval_secs, \
                            last_fetch_at, last_outcome, field_map";

const RECORD_COLUMNS: &str = "id, feed_id, supplier, item_code, item_name, attributes, \
                              snapshot_digest, status, mapped_item, match_conflict, created_at, \
                              decided_by, decided_at";

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    supplier: String,
    name: String,
    format: String,
    url: String,
    enabled: bool,
    fetch_interval_secs: i64,
    last_fetch_at: Option<DateTime<Utc>>,
    last_outcome: Option<serde_json::Value>,
    field_map: serde_json::Value,
}

impl TryFrom<FeedRow> for FeedConfig {
    type Error = StoreError;

    fn try_from(row: FeedRow) -> Result<Self, StoreError> {
        let format = row
            .format
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("feed {}: {e}", row.id)))?;
        let last_outcome: Option<FetchOutcome> = row
            .last_outcome
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("feed {} outcome: {e}", row.id)))?;
        let field_map: FieldMap = serde_json::from_value(row.field_map)
            .map_err(|e| StoreError::Corrupt(format!("feed {} field map: {e}", row.id)))?;

        Ok(FeedConfig {
            id: row.id,
            supplier: row.supplier,
            name: row.name,
            format,
            url: row.url,
            enabled: row.enabled,
            fetch_interval_secs: row.fetch_interval_secs,
            last_fetch_at: row.last_fetch_at,
            last_outcome,
            field_map,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    feed_id: Uuid,
    supplier: String,
    item_code: String,
    item_name: String,
    attributes: serde_json::Value,
    snapshot_digest: String,
    status: String,
    mapped_item: Option<String>,
    match_conflict: bool,
    created_at: DateTime<Utc>,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<RecordRow> for CandidateRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("record {}: {e}", row.id)))?;
        let attributes: BTreeMap<String, String> = serde_json::from_value(row.attributes)
            .map_err(|e| StoreError::Corrupt(format!("record {} attributes: {e}", row.id)))?;

        Ok(CandidateRecord {
            id: row.id,
            feed_id: row.feed_id,
            supplier: row.supplier,
            item_code: row.item_code,
            item_name: row.item_name,
            attributes,
            snapshot_digest: row.snapshot_digest,
            status,
            mapped_item: row.mapped_item,
            match_conflict: row.match_conflict,
            created_at: row.created_at,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Feed configurations in `feed_configs`
pub struct PgFeedStore {
    pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedStore for PgFeedStore {
    async fn list(&self, filter: &FeedFilter) -> Result<Vec<FeedConfig>, StoreError> {
        let mut query = QueryBuilder::new(format!("SELECT {FEED_COLUMNS} FROM feed_configs"));
        let mut prefix = " WHERE ";
        if let Some(supplier) = &filter.supplier {
            query.push(prefix).push("supplier = ").push_bind(supplier);
            prefix = " AND ";
        }
        if let Some(enabled) = filter.enabled {
            query.push(prefix).push("enabled = ").push_bind(enabled);
        }
        query.push(" ORDER BY name");

        let rows: Vec<FeedRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(FeedConfig::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<FeedConfig>, StoreError> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            "SELECT {FEED_COLUMNS} FROM feed_configs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FeedConfig::try_from).transpose()
    }

    async fn list_enabled(&self) -> Result<Vec<FeedConfig>, StoreError> {
        self.list(&FeedFilter {
            enabled: Some(true),
            ..FeedFilter::default()
        })
        .await
    }

    async fn insert(&self, feed: &FeedConfig) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feed_configs
                (id, supplier, name, format, url, enabled, fetch_interval_secs,
                 last_fetch_at, last_outcome, field_map)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(feed.id)
        .bind(&feed.supplier)
        .bind(&feed.name)
        .bind(feed.format.as_str())
        .bind(&feed.url)
        .bind(feed.enabled)
        .bind(feed.fetch_interval_secs)
        .bind(feed.last_fetch_at)
        .bind(feed.last_outcome.as_ref().map(to_json).transpose()?)
        .bind(to_json(&feed.field_map)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_outcome(
        &self,
        feed_id: Uuid,
        outcome: &FetchOutcome,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE feed_configs
            SET last_outcome = $2,
                last_fetch_at = CASE WHEN $3 THEN $4 ELSE last_fetch_at END
            WHERE id = $1
            "#,
        )
        .bind(feed_id)
        .bind(to_json(outcome)?)
        .bind(outcome.success)
        .bind(outcome.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Candidate records in `candidate_records`
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_records
                (id, feed_id, supplier, item_code, item_name, attributes, snapshot_digest,
                 status, mapped_item, match_conflict, created_at, decided_by, decided_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(record.feed_id)
        .bind(&record.supplier)
        .bind(&record.item_code)
        .bind(&record.item_name)
        .bind(to_json(&record.attributes)?)
        .bind(&record.snapshot_digest)
        .bind(record.status.as_str())
        .bind(&record.mapped_item)
        .bind(record.match_conflict)
        .bind(record.created_at)
        .bind(&record.decided_by)
        .bind(record.decided_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM candidate_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn find_open(
        &self,
        feed_id: Uuid,
        item_code: &str,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM candidate_records \
             WHERE feed_id = $1 AND item_code = $2 AND status = 'pending'"
        ))
        .bind(feed_id)
        .bind(item_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {RECORD_COLUMNS} FROM candidate_records"));
        let mut prefix = " WHERE ";
        if let Some(feed_id) = filter.feed_id {
            query.push(prefix).push("feed_id = ").push_bind(feed_id);
            prefix = " AND ";
        }
        if let Some(supplier) = &filter.supplier {
            query.push(prefix).push("supplier = ").push_bind(supplier);
            prefix = " AND ";
        }
        if let Some(status) = filter.status {
            query.push(prefix).push("status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC");

        let rows: Vec<RecordRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(CandidateRecord::try_from).collect()
    }

    async fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM candidate_records GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            match status.parse::<RecordStatus>() {
                Ok(RecordStatus::Pending) => counts.pending = count,
                Ok(RecordStatus::Approved) => counts.approved = count,
                Ok(RecordStatus::Rejected) => counts.rejected = count,
                Ok(RecordStatus::Synced) => counts.synced = count,
                Err(e) => return Err(StoreError::Corrupt(e.to_string())),
            }
        }
        Ok(counts)
    }

    async fn refresh_snapshot(
        &self,
        id: Uuid,
        record: &CandidateRecord,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidate_records
            SET item_name = $2, attributes = $3, snapshot_digest = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(&record.item_name)
        .bind(to_json(&record.attributes)?)
        .bind(&record.snapshot_digest)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RecordStatus,
        to: RecordStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidate_records
            SET status = $2, decided_by = $3, decided_at = $4
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(actor)
        .bind(at)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_mapped_item(
        &self,
        id: Uuid,
        item_ref: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidate_records
            SET mapped_item = $2,
                match_conflict = CASE WHEN $2 IS NULL THEN match_conflict ELSE FALSE END
            WHERE id = $1 AND status <> 'synced'
            "#,
        )
        .bind(id)
        .bind(item_ref)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Catalog items in `catalog_items`
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_item_by_code(&self, code: &str) -> Result<CatalogMatch, StoreError> {
        let mut matches: Vec<String> = sqlx::query_scalar(
            "SELECT item_ref FROM catalog_items WHERE item_code = $1 ORDER BY item_ref",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(match matches.len() {
            0 => CatalogMatch::None,
            1 => CatalogMatch::Unique(matches.remove(0)),
            _ => CatalogMatch::Ambiguous(matches),
        })
    }

    async fn item_exists(&self, item_ref: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM catalog_items WHERE item_ref = $1)")
                .bind(item_ref)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn write_item_fields(
        &self,
        item_ref: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError> {
        // The display name has its own column; everything else merges into
        // the JSONB field bag.
        let mut attributes = fields.clone();
        let item_name = attributes.remove("item_name");

        let result = sqlx::query(
            r#"
            UPDATE catalog_items
            SET item_name = COALESCE($2, item_name),
                fields = fields || $3
            WHERE item_ref = $1
            "#,
        )
        .bind(item_ref)
        .bind(item_name)
        .bind(to_json(&attributes)?)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ItemNotFound(item_ref.to_string()));
        }
        Ok(())
    }
}
