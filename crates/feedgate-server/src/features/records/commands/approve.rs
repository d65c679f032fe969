//! Approve record command

use feedgate_common::{CandidateRecord, RecordStatus};
use serde::Deserialize;
use uuid::Uuid;

use super::{decide, DecideError};
use crate::features::records::DEFAULT_ACTOR;
use crate::store::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveRecordCommand {
    #[serde(skip)]
    pub id: Uuid,
    pub actor: Option<String>,
}

pub async fn handle(
    stores: &Stores,
    command: ApproveRecordCommand,
) -> Result<CandidateRecord, DecideError> {
    let actor = command.actor.as_deref().unwrap_or(DEFAULT_ACTOR);
    decide(stores, command.id, RecordStatus::Approved, actor).await
}
