//! Feature modules implementing the feedgate API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes:
//!
//! - **feeds**: feed configurations, manual fetch triggers and the
//!   on-demand scheduler pass
//! - **records**: candidate record review, the approve/reject/link/sync
//!   lifecycle, and read-only reporting

pub mod feeds;
pub mod records;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::pipeline::{Pipeline, Scheduler};
use crate::store::Stores;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub stores: Stores,
    pub pipeline: Arc<Pipeline>,
    pub scheduler: Arc<Scheduler>,
    /// Bound on the catalog write performed during sync
    pub sync_write_timeout: Duration,
}

/// The `/api/v1` router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/feeds", feeds::feeds_routes().with_state(state.clone()))
        .nest("/records", records::records_routes().with_state(state))
}
