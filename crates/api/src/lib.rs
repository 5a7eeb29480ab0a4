//! cinemap API server library.
//!
//! Exposes config, state, error handling, the metadata catalog and the
//! route tree so integration tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
