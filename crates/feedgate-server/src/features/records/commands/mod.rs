//! Candidate record write operations
//!
//! Approve and reject share one decision path: validate the transition
//! against the current status, then compare-and-set at the store. The
//! loser of a concurrent decision race observes `InvalidTransition`.

pub mod approve;
pub mod link_item;
pub mod reject;
pub mod sync;

pub use approve::ApproveRecordCommand;
pub use link_item::{LinkItemCommand, LinkItemError};
pub use reject::RejectRecordCommand;
pub use sync::{SyncRecordCommand, SyncRecordError};

use chrono::Utc;
use feedgate_common::{CandidateRecord, RecordStatus};
use uuid::Uuid;

use crate::store::{StoreError, Stores};

#[derive(Debug, thiserror::Error)]
pub enum DecideError {
    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error("Record is {from}, cannot move to {to}")]
    InvalidTransition { from: RecordStatus, to: RecordStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Move a record to `to`, stamping the actor and decision time
pub(crate) async fn decide(
    stores: &Stores,
    id: Uuid,
    to: RecordStatus,
    actor: &str,
) -> Result<CandidateRecord, DecideError> {
    let record = stores
        .records
        .get(id)
        .await?
        .ok_or(DecideError::NotFound(id))?;

    let from = record.status;
    if !from.can_transition_to(to) {
        return Err(DecideError::InvalidTransition { from, to });
    }

    let now = Utc::now();
    if !stores.records.transition(id, from, to, actor, now).await? {
        // Lost the race to a concurrent decision
        return Err(DecideError::InvalidTransition { from, to });
    }

    tracing::info!(record_id = %id, from = %from, to = %to, actor = %actor, "Record decided");

    stores
        .records
        .get(id)
        .await?
        .ok_or(DecideError::NotFound(id))
}
