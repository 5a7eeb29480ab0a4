//! Handlers for the `/movies` resource.
//!
//! Reads serve one resolved localization per movie; writes go through
//! `MovieRepo`, which owns transactions and version checks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cinemap_core::locale::Locale;
use cinemap_core::types::RecordUuid;
use cinemap_db::models::movie::{
    CreateMovie, MovieView, UpdateMovie, UpdateMovieLocalizations,
};
use cinemap_db::models::scene::SceneView;
use cinemap_db::repositories::{MovieRepo, SceneRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::{parse_uuid, LocalizationSet};
use crate::query::{LocaleParams, OverrideParams};
use crate::response::{DataResponse, DeletedCount};
use crate::state::AppState;

/// Request body for importing a movie from the metadata source.
#[derive(Debug, Deserialize)]
pub struct ImportMovieRequest {
    pub uuid: RecordUuid,
    pub tmdb_id: i64,
    /// Locale to fetch; the configured default when absent.
    pub locale: Option<String>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// GET /api/v1/movies?locale=en
///
/// List every movie, each in the best available locale.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<LocaleParams>,
) -> AppResult<impl IntoResponse> {
    let default = &state.config.default_locale;
    let requested = params.requested(default)?;

    let records = MovieRepo::list(&state.pool).await?;
    let views = records
        .iter()
        .map(|record| record.view(&requested, default))
        .collect::<Result<Vec<MovieView>, _>>()?;
    Ok(Json(DataResponse { data: views }))
}

/// POST /api/v1/movies
///
/// Create a movie with its first localization. Responds with the view in
/// the created locale.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateMovie>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let view = create_movie(&state, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// POST /api/v1/movies/import
///
/// Fetch base fields and one localization from the metadata source, then
/// create the movie exactly as `POST /movies` would.
pub async fn import(
    State(state): State<AppState>,
    Json(body): Json<ImportMovieRequest>,
) -> AppResult<impl IntoResponse> {
    let locale = match &body.locale {
        Some(code) => Locale::parse(code)?,
        None => state.config.default_locale.clone(),
    };

    let metadata = state.metadata.fetch_movie(body.tmdb_id, &locale).await?;
    tracing::debug!(tmdb_id = body.tmdb_id, %locale, "Fetched movie metadata");

    let input = CreateMovie::from_metadata(body.uuid, metadata);
    input.validate()?;
    let view = create_movie(&state, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// DELETE /api/v1/movies
///
/// Delete every movie (and every scene). Responds with the number of movies removed.
pub async fn delete_all(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let deleted = MovieRepo::delete_all(&state.pool).await?;
    Ok(Json(DataResponse {
        data: DeletedCount { deleted },
    }))
}

// ---------------------------------------------------------------------------
// Single movie
// ---------------------------------------------------------------------------

/// GET /api/v1/movies/{uuid}?locale=en
pub async fn get_by_uuid(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<LocaleParams>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    let default = &state.config.default_locale;
    let requested = params.requested(default)?;

    let record = MovieRepo::get(&state.pool, uuid).await?;
    let view = record.view(&requested, default)?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/movies/{uuid}
///
/// Overwrite base fields and upsert one localization. Responds with the
/// view in the submitted locale.
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(input): Json<UpdateMovie>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    input.validate()?;
    let locale = Locale::parse(&input.localization.locale)?;

    let record = MovieRepo::update(&state.pool, uuid, &input).await?;
    let view = record.view(&locale, &state.config.default_locale)?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/movies/{uuid}
///
/// Delete a movie, its localizations and its scenes.
pub async fn delete(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> AppResult<StatusCode> {
    let uuid = parse_uuid(&uuid)?;
    MovieRepo::delete(&state.pool, uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Localizations
// ---------------------------------------------------------------------------

/// GET /api/v1/movies/{uuid}/localizations
pub async fn list_localizations(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    let rows = MovieRepo::list_localizations(&state.pool, uuid).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// PUT /api/v1/movies/{uuid}/localizations?override=false
///
/// Merge the submitted localizations into the stored set, or replace the
/// set outright with `override=true`.
pub async fn update_localizations(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<OverrideParams>,
    Json(input): Json<UpdateMovieLocalizations>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    input.validate()?;

    let record = MovieRepo::update_localizations(&state.pool, uuid, &input, params.mode()).await?;
    Ok(Json(DataResponse {
        data: LocalizationSet {
            uuid: record.movie.uuid,
            version: record.movie.version,
            localizations: record.localizations.into_iter().map(|(_, row)| row).collect(),
        },
    }))
}

/// GET /api/v1/movies/{uuid}/scenes?locale=en
///
/// List the scenes of one movie, each in the best available locale.
pub async fn list_scenes(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<LocaleParams>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    let default = &state.config.default_locale;
    let requested = params.requested(default)?;

    let records = SceneRepo::list_for_movie(&state.pool, uuid).await?;
    let views = records
        .iter()
        .map(|record| record.view(&requested, default))
        .collect::<Result<Vec<SceneView>, _>>()?;
    Ok(Json(DataResponse { data: views }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_movie(state: &AppState, input: &CreateMovie) -> AppResult<MovieView> {
    let locale = Locale::parse(&input.localization.locale)?;
    let record = MovieRepo::create(&state.pool, input).await?;
    Ok(record.view(&locale, &state.config.default_locale)?)
}
