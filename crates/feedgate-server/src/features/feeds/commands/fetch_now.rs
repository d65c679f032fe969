//! Manual fetch trigger
//!
//! Runs one feed immediately, outside the schedule, under the same
//! per-feed lock the scheduler uses.

use feedgate_common::types::FetchOutcome;
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineError};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct FetchNowCommand {
    pub feed_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchNowError {
    #[error("Feed {0} not found")]
    NotFound(Uuid),

    #[error("Feed {0} is disabled")]
    Disabled(Uuid),

    #[error("Feed {0} already has a run in flight")]
    Busy(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PipelineError> for FetchNowError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(id) => FetchNowError::NotFound(id),
            PipelineError::Disabled(id) => FetchNowError::Disabled(id),
            PipelineError::Busy(id) => FetchNowError::Busy(id),
            PipelineError::Store(e) => FetchNowError::Store(e),
        }
    }
}

pub async fn handle(
    pipeline: &Pipeline,
    command: FetchNowCommand,
) -> Result<FetchOutcome, FetchNowError> {
    Ok(pipeline.fetch_now(command.feed_id).await?)
}
