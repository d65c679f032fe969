use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;

use super::commands::{CheckFeedsError, FetchNowCommand, FetchNowError};
use super::queries::{GetFeedError, GetFeedQuery, ListFeedsError, ListFeedsQuery};

pub fn feeds_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_feeds))
        .route("/check", post(check_feeds))
        .route("/:id", get(get_feed))
        .route("/:id/fetch", post(fetch_feed_now))
}

#[tracing::instrument(skip(state, query))]
async fn list_feeds(
    State(state): State<FeatureState>,
    Query(query): Query<ListFeedsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(&state.stores, query).await?;

    tracing::debug!(count = response.count, "Feeds listed via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state), fields(id = %id))]
async fn get_feed(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::queries::get::handle(&state.stores, GetFeedQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state), fields(id = %id))]
async fn fetch_feed_now(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome =
        super::commands::fetch_now::handle(&state.pipeline, FetchNowCommand { feed_id: id })
            .await?;

    tracing::info!(
        feed_id = %id,
        success = outcome.success,
        "Manual fetch triggered via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(outcome))).into_response())
}

#[tracing::instrument(skip(state))]
async fn check_feeds(State(state): State<FeatureState>) -> Result<Response, AppError> {
    let response = super::commands::check::handle(&state.scheduler).await?;

    tracing::info!(started = response.started, "Scheduler pass triggered via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

impl From<ListFeedsError> for AppError {
    fn from(err: ListFeedsError) -> Self {
        match err {
            ListFeedsError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<GetFeedError> for AppError {
    fn from(err: GetFeedError) -> Self {
        match err {
            GetFeedError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetFeedError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<FetchNowError> for AppError {
    fn from(err: FetchNowError) -> Self {
        match err {
            FetchNowError::NotFound(_) => AppError::NotFound(err.to_string()),
            FetchNowError::Disabled(_) | FetchNowError::Busy(_) => {
                AppError::Conflict(err.to_string())
            },
            FetchNowError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<CheckFeedsError> for AppError {
    fn from(err: CheckFeedsError) -> Self {
        match err {
            CheckFeedsError::Store(e) => AppError::Store(e),
        }
    }
}
