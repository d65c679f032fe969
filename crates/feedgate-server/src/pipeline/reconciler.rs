//! Row reconciliation
//!
//! Folds the canonical rows of one feed run into candidate records.
//! Decisions already made by a reviewer are never disturbed: terminal
//! records are invisible to reconciliation, and a record decided while a
//! refresh is in flight keeps its decided snapshot.

use chrono::Utc;
use feedgate_common::digest::snapshot_digest;
use feedgate_common::types::CanonicalRow;
use feedgate_common::{CandidateRecord, FeedConfig};
use serde::Serialize;

use crate::store::{CatalogMatch, StoreError, Stores};

/// Per-run reconciliation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub conflicts: u32,
}

/// Reconcile one run's rows against the open records of `feed`
pub async fn reconcile(
    stores: &Stores,
    feed: &FeedConfig,
    rows: &[CanonicalRow],
) -> Result<ReconcileSummary, StoreError> {
    let now = Utc::now();
    let mut summary = ReconcileSummary::default();

    for row in rows {
        match stores.records.find_open(feed.id, &row.item_code).await? {
            Some(open) => {
                let digest = snapshot_digest(&row.item_name, &row.attributes);
                if open.snapshot_digest == digest {
                    summary.unchanged += 1;
                    continue;
                }
                let snapshot = CandidateRecord::from_row(feed, row, now);
                if stores.records.refresh_snapshot(open.id, &snapshot).await? {
                    summary.updated += 1;
                } else {
                    // Decided between find and refresh; the decision wins
                    summary.unchanged += 1;
                }
            },
            None => {
                let mut record = CandidateRecord::from_row(feed, row, now);
                match stores.catalog.find_item_by_code(&row.item_code).await? {
                    CatalogMatch::Unique(item_ref) => {
                        record.mapped_item = Some(item_ref);
                    },
                    CatalogMatch::Ambiguous(candidates) => {
                        record.match_conflict = true;
                        summary.conflicts += 1;
                        tracing::warn!(
                            feed_id = %feed.id,
                            item_code = %row.item_code,
                            candidates = candidates.len(),
                            "Ambiguous catalog match left for manual resolution"
                        );
                    },
                    CatalogMatch::None => {},
                }
                stores.records.insert(&record).await?;
                summary.created += 1;
            },
        }
    }

    Ok(summary)
}
