//! Route definitions for scenes.

use axum::routing::get;
use axum::Router;

use crate::handlers::scene;
use crate::state::AppState;

/// Routes mounted at `/scenes`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// DELETE /                        -> delete_all
/// GET    /{uuid}                  -> get_by_uuid
/// PUT    /{uuid}                  -> update
/// DELETE /{uuid}                  -> delete
/// GET    /{uuid}/localizations    -> list_localizations
/// PUT    /{uuid}/localizations    -> update_localizations
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(scene::list)
                .post(scene::create)
                .delete(scene::delete_all),
        )
        .route(
            "/{uuid}",
            get(scene::get_by_uuid)
                .put(scene::update)
                .delete(scene::delete),
        )
        .route(
            "/{uuid}/localizations",
            get(scene::list_localizations).put(scene::update_localizations),
        )
}
