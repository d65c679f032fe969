pub mod response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use feedgate_ingest::fetch::FetchConfig;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::pipeline::{Pipeline, Scheduler};
use crate::store::Stores;

/// Connect, migrate, start the scheduler and serve until shutdown
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let stores = Stores::postgres(pool);
    let pipeline = Arc::new(Pipeline::new(
        stores.clone(),
        FetchConfig {
            timeout_secs: config.fetch.timeout_secs,
            max_attempts: config.fetch.max_attempts,
            backoff_ms: config.fetch.backoff_ms,
        },
    )?);
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&pipeline), config.scheduler.clone()));

    if config.scheduler.enabled {
        Arc::clone(&scheduler).start();
    } else {
        tracing::info!("Scheduler disabled, feeds run on manual triggers only");
    }

    let state = FeatureState {
        stores,
        pipeline,
        scheduler,
        sync_write_timeout: Duration::from_secs(config.sync.write_timeout_secs),
    };
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = features::router(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Feedgate Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Resolves on ctrl-c or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => tracing::error!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
