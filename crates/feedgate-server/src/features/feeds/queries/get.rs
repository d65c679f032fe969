//! Get feed configuration query

use feedgate_common::FeedConfig;
use uuid::Uuid;

use crate::store::{StoreError, Stores};

#[derive(Debug, Clone, Copy)]
pub struct GetFeedQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetFeedError {
    #[error("Feed {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(stores: &Stores, query: GetFeedQuery) -> Result<FeedConfig, GetFeedError> {
    stores
        .feeds
        .get(query.id)
        .await?
        .ok_or(GetFeedError::NotFound(query.id))
}
