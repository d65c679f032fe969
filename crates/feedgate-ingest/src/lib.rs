//! Feedgate Ingest Library
//!
//! Retrieval and normalization of supplier feeds.
//!
//! # Pipeline position
//!
//! - [`fetch`]: retrieves raw feed bytes over HTTP with bounded retry
//! - [`parser`]: decodes CSV/XML/JSON payloads into canonical rows
//!
//! Reconciliation against the catalog and the review lifecycle live in
//! `feedgate-server`; this crate is deliberately free of persistence.
//!
//! # Example
//!
//! ```no_run
//! use feedgate_common::types::{FeedFormat, FieldMap};
//! use feedgate_ingest::parser::decode_feed;
//!
//! let decoded = decode_feed(
//!     FeedFormat::Csv,
//!     b"code,name\nA1,WidgetA\n",
//!     &FieldMap::default(),
//! )?;
//! assert_eq!(decoded.rows.len(), 1);
//! # Ok::<(), feedgate_ingest::parser::ParseError>(())
//! ```

pub mod fetch;
pub mod parser;

pub use fetch::{FeedFetcher, FetchConfig, FetchError};
pub use parser::{decode_feed, Decoded, ParseError};
