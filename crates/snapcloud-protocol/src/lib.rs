//! Payloads exchanged with the relay's HTTP API.
pub mod auth;
pub mod common;
pub mod files;
pub mod header;
