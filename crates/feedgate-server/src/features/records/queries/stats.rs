//! Record status counts query
//!
//! Read-only aggregate serving review dashboards.

use crate::store::{StatusCounts, StoreError, Stores};

#[derive(Debug, thiserror::Error)]
pub enum RecordStatsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(stores: &Stores) -> Result<StatusCounts, RecordStatsError> {
    Ok(stores.records.status_counts().await?)
}
