//! List candidate records query

use feedgate_common::{CandidateRecord, RecordStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{RecordFilter, StoreError, Stores};

/// Query for candidate records by feed, supplier and/or status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub feed_id: Option<Uuid>,
    pub supplier: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub records: Vec<CandidateRecord>,
    pub count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ListRecordsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(
    stores: &Stores,
    query: ListRecordsQuery,
) -> Result<ListRecordsResponse, ListRecordsError> {
    let filter = RecordFilter {
        feed_id: query.feed_id,
        supplier: query.supplier,
        status: query.status,
    };
    let records = stores.records.list(&filter).await?;
    let count = records.len();
    Ok(ListRecordsResponse { records, count })
}
