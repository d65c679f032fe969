//! Sync record command
//!
//! Writes an approved record's snapshot onto its mapped catalog item,
//! then moves the record to synced. Ordering is the invariant: the record
//! only becomes synced after the catalog write succeeded, and a failed or
//! timed-out write leaves it approved for a later retry.

use std::time::Duration;

use feedgate_common::{CandidateRecord, RecordStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::features::records::DEFAULT_ACTOR;
use crate::store::{StoreError, Stores};

#[derive(Debug, Clone, Deserialize)]
pub struct SyncRecordCommand {
    #[serde(skip)]
    pub id: Uuid,
    pub actor: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncRecordError {
    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error("Record is {from}, only approved records sync")]
    InvalidTransition { from: RecordStatus },

    #[error("Record has no mapped catalog item")]
    NoMappedItem,

    #[error("Catalog write failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(
    stores: &Stores,
    command: SyncRecordCommand,
    write_timeout: Duration,
) -> Result<CandidateRecord, SyncRecordError> {
    let record = stores
        .records
        .get(command.id)
        .await?
        .ok_or(SyncRecordError::NotFound(command.id))?;

    if record.status != RecordStatus::Approved {
        return Err(SyncRecordError::InvalidTransition { from: record.status });
    }
    let item_ref = record
        .mapped_item
        .as_deref()
        .ok_or(SyncRecordError::NoMappedItem)?;

    let fields = record.sync_fields();
    let write = stores.catalog.write_item_fields(item_ref, &fields);
    match tokio::time::timeout(write_timeout, write).await {
        Err(_) => {
            return Err(SyncRecordError::WriteFailed(format!(
                "timed out after {}s",
                write_timeout.as_secs()
            )));
        },
        Ok(Err(err)) => return Err(SyncRecordError::WriteFailed(err.to_string())),
        Ok(Ok(())) => {},
    }

    let actor = command.actor.as_deref().unwrap_or(DEFAULT_ACTOR);
    let now = chrono::Utc::now();
    if !stores
        .records
        .transition(command.id, RecordStatus::Approved, RecordStatus::Synced, actor, now)
        .await?
    {
        return Err(SyncRecordError::InvalidTransition { from: RecordStatus::Approved });
    }

    tracing::info!(
        record_id = %command.id,
        item = %item_ref,
        actor = %actor,
        "Record synced to catalog"
    );

    stores
        .records
        .get(command.id)
        .await?
        .ok_or(SyncRecordError::NotFound(command.id))
}
