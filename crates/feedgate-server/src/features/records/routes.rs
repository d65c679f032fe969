use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;

use super::commands::{
    ApproveRecordCommand, DecideError, LinkItemCommand, LinkItemError, RejectRecordCommand,
    SyncRecordCommand, SyncRecordError,
};
use super::queries::{
    GetRecordError, GetRecordQuery, ListRecordsError, ListRecordsQuery, RecordStatsError,
};

pub fn records_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_records))
        .route("/stats", get(record_stats))
        .route("/:id", get(get_record))
        .route("/:id/approve", post(approve_record))
        .route("/:id/reject", post(reject_record))
        .route("/:id/sync", post(sync_record))
        .route("/:id/item", put(link_item))
}

#[tracing::instrument(skip(state, query))]
async fn list_records(
    State(state): State<FeatureState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(&state.stores, query).await?;

    tracing::debug!(count = response.count, "Records listed via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state))]
async fn record_stats(State(state): State<FeatureState>) -> Result<Response, AppError> {
    let counts = super::queries::stats::handle(&state.stores).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(counts))).into_response())
}

#[tracing::instrument(skip(state), fields(id = %id))]
async fn get_record(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = super::queries::get::handle(&state.stores, GetRecordQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, body), fields(id = %id))]
async fn approve_record(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveRecordCommand>>,
) -> Result<Response, AppError> {
    let mut command = body.map(|Json(c)| c).unwrap_or(ApproveRecordCommand {
        id,
        actor: None,
    });
    command.id = id;

    let record = super::commands::approve::handle(&state.stores, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, body), fields(id = %id))]
async fn reject_record(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRecordCommand>>,
) -> Result<Response, AppError> {
    let mut command = body.map(|Json(c)| c).unwrap_or(RejectRecordCommand {
        id,
        actor: None,
    });
    command.id = id;

    let record = super::commands::reject::handle(&state.stores, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, body), fields(id = %id))]
async fn sync_record(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    body: Option<Json<SyncRecordCommand>>,
) -> Result<Response, AppError> {
    let mut command = body.map(|Json(c)| c).unwrap_or(SyncRecordCommand {
        id,
        actor: None,
    });
    command.id = id;

    let record =
        super::commands::sync::handle(&state.stores, command, state.sync_write_timeout).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, command), fields(id = %id))]
async fn link_item(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(mut command): Json<LinkItemCommand>,
) -> Result<Response, AppError> {
    command.id = id;

    let record = super::commands::link_item::handle(&state.stores, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

impl From<ListRecordsError> for AppError {
    fn from(err: ListRecordsError) -> Self {
        match err {
            ListRecordsError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<RecordStatsError> for AppError {
    fn from(err: RecordStatsError) -> Self {
        match err {
            RecordStatsError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<GetRecordError> for AppError {
    fn from(err: GetRecordError) -> Self {
        match err {
            GetRecordError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetRecordError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<DecideError> for AppError {
    fn from(err: DecideError) -> Self {
        match err {
            DecideError::NotFound(_) => AppError::NotFound(err.to_string()),
            DecideError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            DecideError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<LinkItemError> for AppError {
    fn from(err: LinkItemError) -> Self {
        match err {
            LinkItemError::NotFound(_) => AppError::NotFound(err.to_string()),
            LinkItemError::ItemNotFound(_) => AppError::Validation(err.to_string()),
            LinkItemError::MappingImmutable => AppError::Conflict(err.to_string()),
            LinkItemError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<SyncRecordError> for AppError {
    fn from(err: SyncRecordError) -> Self {
        match err {
            SyncRecordError::NotFound(_) => AppError::NotFound(err.to_string()),
            SyncRecordError::InvalidTransition { .. } | SyncRecordError::NoMappedItem => {
                AppError::Conflict(err.to_string())
            },
            SyncRecordError::WriteFailed(_) => AppError::SyncFailed(err.to_string()),
            SyncRecordError::Store(e) => AppError::Store(e),
        }
    }
}
