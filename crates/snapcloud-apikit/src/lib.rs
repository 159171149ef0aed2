//! Shared building blocks for the SnapCloud HTTP API.
pub mod middleware;
pub mod payload;
pub mod reject;
pub mod reply;
