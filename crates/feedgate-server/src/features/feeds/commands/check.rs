//! On-demand scheduler pass
//!
//! Runs one scheduling tick immediately: every enabled, due, unlocked
//! feed gets a run. Mirrors the periodic background tick.

use serde::Serialize;

use crate::pipeline::Scheduler;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct CheckFeedsResponse {
    /// Feeds that started a run this pass
    pub started: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckFeedsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(scheduler: &Scheduler) -> Result<CheckFeedsResponse, CheckFeedsError> {
    let started = scheduler.tick().await?;
    Ok(CheckFeedsResponse { started })
}
