//! Feed read operations

pub mod get;
pub mod list;

pub use get::{GetFeedError, GetFeedQuery};
pub use list::{ListFeedsError, ListFeedsQuery};
