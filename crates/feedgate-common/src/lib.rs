//! Feedgate Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the feedgate workspace.
//!
//! # Overview
//!
//! This crate provides functionality used across all feedgate workspace members:
//!
//! - **Types**: the feed/record domain model shared by the ingest pipeline
//!   and the server
//! - **Digest**: canonical snapshot fingerprinting for change detection
//! - **Logging**: centralized tracing configuration
//!
//! # Example
//!
//! ```no_run
//! use feedgate_common::types::{CanonicalRow, FieldMap};
//!
//! let map = FieldMap::default();
//! assert_eq!(map.item_code_field, "code");
//! ```

pub mod digest;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{CandidateRecord, CanonicalRow, FeedConfig, FeedFormat, FieldMap, RecordStatus};
