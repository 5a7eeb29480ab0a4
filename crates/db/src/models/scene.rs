//! Scene entity model, localization rows, DTOs and the flat scene view.
//!
//! A scene is a geolocated point belonging to exactly one movie.

use cinemap_core::error::CoreError;
use cinemap_core::locale::{validate_locale_code, Locale};
use cinemap_core::localization::Localizations;
use cinemap_core::types::{DbId, RecordUuid, Timestamp, Version};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `scenes` table joined with the owning movie's uuid.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Scene {
    #[serde(skip_serializing)]
    pub id: DbId,
    pub uuid: RecordUuid,
    pub version: Version,
    #[serde(skip_serializing)]
    pub movie_id: DbId,
    pub movie_uuid: RecordUuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `scene_localizations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SceneLocalization {
    #[serde(skip_serializing)]
    pub id: DbId,
    #[serde(skip_serializing)]
    pub scene_id: DbId,
    pub locale: String,
    pub title: String,
    pub description: Option<String>,
}

/// Locale-independent scene fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SceneFields {
    pub movie_uuid: RecordUuid,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// One localized scene variant as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SceneLocalizationInput {
    #[validate(custom(function = "validate_locale_code"))]
    pub locale: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
}

impl From<SceneLocalization> for SceneLocalizationInput {
    fn from(row: SceneLocalization) -> Self {
        Self {
            locale: row.locale,
            title: row.title,
            description: row.description,
        }
    }
}

/// DTO for creating a scene with its initial localization.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct CreateScene {
    pub uuid: RecordUuid,
    #[validate(nested)]
    pub scene: SceneFields,
    #[validate(nested)]
    pub localization: SceneLocalizationInput,
}

/// DTO for overwriting scene fields and upserting one localization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateScene {
    pub version: Option<Version>,
    #[validate(nested)]
    pub scene: SceneFields,
    #[validate(nested)]
    pub localization: SceneLocalizationInput,
}

/// DTO for bulk-updating the localization set of a scene.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSceneLocalizations {
    pub version: Option<Version>,
    #[validate(length(min = 1), nested)]
    pub localizations: Vec<SceneLocalizationInput>,
}

/// A scene together with every localization it owns.
#[derive(Debug, Clone)]
pub struct SceneRecord {
    pub scene: Scene,
    pub localizations: Localizations<SceneLocalization>,
}

impl SceneRecord {
    pub fn view(&self, requested: &Locale, default: &Locale) -> Result<SceneView, CoreError> {
        let resolution = self.localizations.resolve(requested, default)?;
        if resolution.fallback {
            tracing::debug!(
                uuid = %self.scene.uuid,
                requested = %requested,
                served = %resolution.locale,
                "Serving fallback scene localization"
            );
        }
        SceneView::assemble(self, &resolution.locale)
    }
}

/// Flat scene representation: base fields plus exactly one localization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneView {
    pub uuid: RecordUuid,
    pub version: Version,
    pub locale: String,
    pub movie_uuid: RecordUuid,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: Option<String>,
}

impl SceneView {
    pub fn assemble(record: &SceneRecord, locale: &Locale) -> Result<Self, CoreError> {
        let localization =
            record
                .localizations
                .get(locale)
                .ok_or_else(|| CoreError::LocaleNotFound {
                    requested: locale.to_string(),
                })?;
        let scene = &record.scene;

        Ok(Self {
            uuid: scene.uuid,
            version: scene.version,
            locale: locale.to_string(),
            movie_uuid: scene.movie_uuid,
            latitude: scene.latitude,
            longitude: scene.longitude,
            title: localization.title.clone(),
            description: localization.description.clone(),
        })
    }
}

impl From<SceneView> for CreateScene {
    fn from(view: SceneView) -> Self {
        Self {
            uuid: view.uuid,
            scene: SceneFields {
                movie_uuid: view.movie_uuid,
                latitude: view.latitude,
                longitude: view.longitude,
            },
            localization: SceneLocalizationInput {
                locale: view.locale,
                title: view.title,
                description: view.description,
            },
        }
    }
}
