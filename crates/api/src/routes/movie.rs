//! Route definitions for movies.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::movie;
use crate::state::AppState;

/// Routes mounted at `/movies`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// DELETE /                        -> delete_all
/// POST   /import                  -> import
/// GET    /{uuid}                  -> get_by_uuid
/// PUT    /{uuid}                  -> update
/// DELETE /{uuid}                  -> delete
/// GET    /{uuid}/localizations    -> list_localizations
/// PUT    /{uuid}/localizations    -> update_localizations
/// GET    /{uuid}/scenes           -> list_scenes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(movie::list)
                .post(movie::create)
                .delete(movie::delete_all),
        )
        .route("/import", post(movie::import))
        .route(
            "/{uuid}",
            get(movie::get_by_uuid)
                .put(movie::update)
                .delete(movie::delete),
        )
        .route(
            "/{uuid}/localizations",
            get(movie::list_localizations).put(movie::update_localizations),
        )
        .route("/{uuid}/scenes", get(movie::list_scenes))
}
