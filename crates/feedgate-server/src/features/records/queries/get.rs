//! Get candidate record query

use feedgate_common::CandidateRecord;
use uuid::Uuid;

use crate::store::{StoreError, Stores};

#[derive(Debug, Clone, Copy)]
pub struct GetRecordQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetRecordError {
    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(
    stores: &Stores,
    query: GetRecordQuery,
) -> Result<CandidateRecord, GetRecordError> {
    stores
        .records
        .get(query.id)
        .await?
        .ok_or(GetRecordError::NotFound(query.id))
}
