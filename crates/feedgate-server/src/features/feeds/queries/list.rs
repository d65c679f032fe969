//! List feed configurations query

use feedgate_common::FeedConfig;
use serde::{Deserialize, Serialize};

use crate::store::{FeedFilter, StoreError, Stores};

/// Query for feed configurations, optionally narrowed by supplier or
/// enabled flag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFeedsQuery {
    pub supplier: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ListFeedsResponse {
    pub feeds: Vec<FeedConfig>,
    pub count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ListFeedsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn handle(
    stores: &Stores,
    query: ListFeedsQuery,
) -> Result<ListFeedsResponse, ListFeedsError> {
    let filter = FeedFilter {
        supplier: query.supplier,
        enabled: query.enabled,
    };
    let feeds = stores.feeds.list(&filter).await?;
    let count = feeds.len();
    Ok(ListFeedsResponse { feeds, count })
}
