//! Feed configuration feature

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::feeds_routes;
