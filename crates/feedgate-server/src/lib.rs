//! Feedgate Server Library
//!
//! HTTP service around the supplier-feed ingestion and reconciliation
//! pipeline.
//!
//! # Overview
//!
//! - **Pipeline**: scheduled or manually triggered fetch → parse →
//!   reconcile runs, one per feed configuration, exclusive per feed
//! - **Lifecycle**: human-gated review of candidate records
//!   (approve/reject/link/sync) with compare-and-set transitions
//! - **API**: REST endpoints for triggers, review decisions and read-only
//!   reporting
//! - **Stores**: persistence and catalog collaborators behind traits, with
//!   Postgres (SQLx) and in-memory implementations
//!
//! # Architecture
//!
//! Features follow a commands/queries split: write operations live in
//! `features/*/commands`, read operations in `features/*/queries`, each as
//! a self-contained handler with its own input/output/error types. The
//! pipeline holds the only cross-cutting lock in the system, a per-feed
//! mutual-exclusion registry that prevents overlapping runs for the same
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use feedgate_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use error::AppError;
