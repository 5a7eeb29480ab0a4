use std::sync::Arc;

use cinemap_core::metadata::MetadataSource;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cinemap_db::DbPool,
    /// Server configuration (default locale, timeouts).
    pub config: Arc<ServerConfig>,
    /// Source of initial movie data for imports.
    pub metadata: Arc<dyn MetadataSource>,
}
