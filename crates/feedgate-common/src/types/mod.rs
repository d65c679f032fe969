//! Common types used across feedgate

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declared wire format of a supplier feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Csv,
    Xml,
    Json,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Csv => "csv",
            FeedFormat::Xml => "xml",
            FeedFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown feed format: {0}")]
pub struct UnknownFormat(pub String);

impl std::str::FromStr for FeedFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FeedFormat::Csv),
            "xml" => Ok(FeedFormat::Xml),
            "json" => Ok(FeedFormat::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Review lifecycle status of a candidate record
///
/// Statuses move monotonically along
/// `Pending -> {Approved, Rejected} -> Synced`. `Rejected` and `Synced` are
/// terminal; a record never re-enters `Pending` once decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
    Synced,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Synced => "synced",
        }
    }

    /// A terminal record takes no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Rejected | RecordStatus::Synced)
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Pending, RecordStatus::Approved)
                | (RecordStatus::Pending, RecordStatus::Rejected)
                | (RecordStatus::Approved, RecordStatus::Synced)
        )
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown record status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for RecordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "approved" => Ok(RecordStatus::Approved),
            "rejected" => Ok(RecordStatus::Rejected),
            "synced" => Ok(RecordStatus::Synced),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Format-independent representation of one feed entry
///
/// Produced by the parsers, consumed by the reconciler; never persisted on
/// its own. Attributes use a `BTreeMap` so equivalent feeds digest
/// identically regardless of source format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub item_code: String,
    pub item_name: String,
    pub attributes: BTreeMap<String, String>,
}

/// Maps supplier field names onto the canonical row shape
///
/// `item_code_field` and `item_name_field` name the source columns/keys that
/// carry the SKU and display name. `renames` translates any remaining source
/// field to a canonical attribute name; unmapped fields pass through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub item_code_field: String,
    pub item_name_field: String,
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            item_code_field: "code".to_string(),
            item_name_field: "name".to_string(),
            renames: BTreeMap::new(),
        }
    }
}

impl FieldMap {
    /// Canonical attribute name for a source field, if it is an attribute
    /// (the code/name source fields are consumed by the row itself).
    pub fn attribute_name<'a>(&'a self, source: &'a str) -> Option<&'a str> {
        if source == self.item_code_field || source == self.item_name_field {
            return None;
        }
        Some(self.renames.get(source).map(String::as_str).unwrap_or(source))
    }
}

/// Outcome of one fetch/parse/reconcile run, recorded on the feed config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub success: bool,
    /// Reason code on failure (e.g. "fetch_timeout", "parse_error")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub finished_at: DateTime<Utc>,
}

impl FetchOutcome {
    pub fn failure(reason: impl Into<String>, finished_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            finished_at,
        }
    }
}

/// A supplier's declared feed source and fetch policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: Uuid,
    pub supplier: String,
    pub name: String,
    pub format: FeedFormat,
    pub url: String,
    pub enabled: bool,
    pub fetch_interval_secs: i64,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<FetchOutcome>,
    #[serde(default)]
    pub field_map: FieldMap,
}

impl FeedConfig {
    /// Whether the schedule calls for a fetch at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_fetch_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= self.fetch_interval_secs,
        }
    }
}

/// A reviewable unit representing one item's proposed state from a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub supplier: String,
    pub item_code: String,
    pub item_name: String,
    /// Raw normalized attributes for the current pending version
    pub attributes: BTreeMap<String, String>,
    /// Fingerprint of (item_name, attributes), used for change detection
    pub snapshot_digest: String,
    pub status: RecordStatus,
    pub mapped_item: Option<String>,
    /// Set when the opportunistic catalog lookup was ambiguous; cleared by
    /// an explicit link
    pub match_conflict: bool,
    pub created_at: DateTime<Utc>,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    /// Start a fresh pending record from a canonical row
    pub fn from_row(feed: &FeedConfig, row: &CanonicalRow, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id: feed.id,
            supplier: feed.supplier.clone(),
            item_code: row.item_code.clone(),
            item_name: row.item_name.clone(),
            attributes: row.attributes.clone(),
            snapshot_digest: crate::digest::snapshot_digest(&row.item_name, &row.attributes),
            status: RecordStatus::Pending,
            mapped_item: None,
            match_conflict: false,
            created_at: now,
            decided_by: None,
            decided_at: None,
        }
    }

    /// Fields written onto the catalog item during sync: display name plus
    /// the full attribute snapshot.
    pub fn sync_fields(&self) -> BTreeMap<String, String> {
        let mut fields = self.attributes.clone();
        fields.insert("item_name".to_string(), self.item_name.clone());
        fields
    }
}
