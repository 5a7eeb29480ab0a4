//! Handlers for the `/scenes` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cinemap_core::locale::Locale;
use cinemap_db::models::scene::{CreateScene, SceneView, UpdateScene, UpdateSceneLocalizations};
use cinemap_db::repositories::SceneRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::{parse_uuid, LocalizationSet};
use crate::query::{LocaleParams, OverrideParams};
use crate::response::{DataResponse, DeletedCount};
use crate::state::AppState;

/// GET /api/v1/scenes?locale=en
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<LocaleParams>,
) -> AppResult<impl IntoResponse> {
    let default = &state.config.default_locale;
    let requested = params.requested(default)?;

    let records = SceneRepo::list(&state.pool).await?;
    let views = records
        .iter()
        .map(|record| record.view(&requested, default))
        .collect::<Result<Vec<SceneView>, _>>()?;
    Ok(Json(DataResponse { data: views }))
}

/// POST /api/v1/scenes
///
/// Create a scene under an existing movie.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateScene>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let locale = Locale::parse(&input.localization.locale)?;

    let record = SceneRepo::create(&state.pool, &input).await?;
    let view = record.view(&locale, &state.config.default_locale)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// DELETE /api/v1/scenes
pub async fn delete_all(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let deleted = SceneRepo::delete_all(&state.pool).await?;
    Ok(Json(DataResponse {
        data: DeletedCount { deleted },
    }))
}

/// GET /api/v1/scenes/{uuid}?locale=en
pub async fn get_by_uuid(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<LocaleParams>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    let default = &state.config.default_locale;
    let requested = params.requested(default)?;

    let record = SceneRepo::get(&state.pool, uuid).await?;
    let view = record.view(&requested, default)?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/scenes/{uuid}
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(input): Json<UpdateScene>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    input.validate()?;
    let locale = Locale::parse(&input.localization.locale)?;

    let record = SceneRepo::update(&state.pool, uuid, &input).await?;
    let view = record.view(&locale, &state.config.default_locale)?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/scenes/{uuid}
pub async fn delete(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> AppResult<StatusCode> {
    let uuid = parse_uuid(&uuid)?;
    SceneRepo::delete(&state.pool, uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/scenes/{uuid}/localizations
pub async fn list_localizations(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    let rows = SceneRepo::list_localizations(&state.pool, uuid).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// PUT /api/v1/scenes/{uuid}/localizations?override=false
pub async fn update_localizations(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<OverrideParams>,
    Json(input): Json<UpdateSceneLocalizations>,
) -> AppResult<impl IntoResponse> {
    let uuid = parse_uuid(&uuid)?;
    input.validate()?;

    let record = SceneRepo::update_localizations(&state.pool, uuid, &input, params.mode()).await?;
    Ok(Json(DataResponse {
        data: LocalizationSet {
            uuid: record.scene.uuid,
            version: record.scene.version,
            localizations: record.localizations.into_iter().map(|(_, row)| row).collect(),
        },
    }))
}
