//! Feed write operations

pub mod check;
pub mod fetch_now;

pub use check::{CheckFeedsError, CheckFeedsResponse};
pub use fetch_now::{FetchNowCommand, FetchNowError};
