pub mod health;
pub mod movie;
pub mod scene;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /movies                                  list, create, delete all
/// /movies/import                           create from metadata source (POST)
/// /movies/{uuid}                           get, update, delete
/// /movies/{uuid}/localizations             list, bulk update (?override=)
/// /movies/{uuid}/scenes                    scenes of one movie
///
/// /scenes                                  list, create, delete all
/// /scenes/{uuid}                           get, update, delete
/// /scenes/{uuid}/localizations             list, bulk update (?override=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/movies", movie::router())
        .nest("/scenes", scene::router())
}
