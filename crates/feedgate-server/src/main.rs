//! Feedgate Server
//!
//! Supplier feed ingestion and reconciliation service.

use anyhow::Result;
use feedgate_common::logging::{init_logging, LogConfig};
use feedgate_server::api;
use feedgate_server::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder()
            .log_file_prefix("feedgate-server".to_string())
            .build()
    });
    init_logging(&log_config)?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        scheduler = config.scheduler.enabled,
        "Starting feedgate server"
    );

    api::serve(config).await
}
