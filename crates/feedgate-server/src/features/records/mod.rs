//! Candidate record feature

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::records_routes;

/// Actor recorded on a decision when the request names none
pub const DEFAULT_ACTOR: &str = "system";
