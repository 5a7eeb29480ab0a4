//! Movie entity model, localization rows, DTOs and the flat movie view.

use std::collections::BTreeMap;

use cinemap_core::error::CoreError;
use cinemap_core::locale::{validate_locale_code, Locale};
use cinemap_core::localization::Localizations;
use cinemap_core::metadata::MovieMetadata;
use cinemap_core::types::{DbId, RecordUuid, Timestamp, Version};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// A row from the `movies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movie {
    #[serde(skip_serializing)]
    pub id: DbId,
    pub uuid: RecordUuid,
    pub version: Version,
    pub tmdb_id: i64,
    pub release_year: Option<i32>,
    pub genres: Json<BTreeMap<i32, String>>,
    pub imdb_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `movie_localizations` table.
///
/// `movie_id` is the only link back to the owning movie.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieLocalization {
    #[serde(skip_serializing)]
    pub id: DbId,
    #[serde(skip_serializing)]
    pub movie_id: DbId,
    pub locale: String,
    pub title: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_url: Option<String>,
}

/// Locale-independent movie fields, as written by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MovieFields {
    #[validate(range(min = 1))]
    pub tmdb_id: i64,
    #[validate(range(min = 1870, max = 2200))]
    pub release_year: Option<i32>,
    /// Genre id to genre name.
    #[serde(default)]
    pub genres: BTreeMap<i32, String>,
    #[validate(length(min = 1, max = 32))]
    pub imdb_id: Option<String>,
}

/// One localized variant as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MovieLocalizationInput {
    #[validate(custom(function = "validate_locale_code"))]
    pub locale: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub overview: Option<String>,
    #[validate(length(max = 1000))]
    pub tagline: Option<String>,
    #[validate(url, length(max = 2048))]
    pub poster_url: Option<String>,
}

impl From<MovieLocalization> for MovieLocalizationInput {
    fn from(row: MovieLocalization) -> Self {
        Self {
            locale: row.locale,
            title: row.title,
            overview: row.overview,
            tagline: row.tagline,
            poster_url: row.poster_url,
        }
    }
}

/// DTO for creating a movie with its initial localization.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct CreateMovie {
    pub uuid: RecordUuid,
    #[validate(nested)]
    pub movie: MovieFields,
    #[validate(nested)]
    pub localization: MovieLocalizationInput,
}

impl CreateMovie {
    /// Build a create request from metadata delivered by a metadata source.
    pub fn from_metadata(uuid: RecordUuid, metadata: MovieMetadata) -> Self {
        let localization = metadata.localization;
        Self {
            uuid,
            movie: MovieFields {
                tmdb_id: metadata.tmdb_id,
                release_year: metadata.release_year,
                genres: metadata.genres,
                imdb_id: metadata.imdb_id,
            },
            localization: MovieLocalizationInput {
                locale: localization.locale.into(),
                title: localization.title,
                overview: localization.overview,
                tagline: localization.tagline,
                poster_url: localization.poster_url,
            },
        }
    }
}

/// DTO for overwriting base fields and upserting one localization.
///
/// When `version` is present it must match the stored version.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMovie {
    pub version: Option<Version>,
    #[validate(nested)]
    pub movie: MovieFields,
    #[validate(nested)]
    pub localization: MovieLocalizationInput,
}

/// DTO for bulk-updating the localization set of a movie.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMovieLocalizations {
    pub version: Option<Version>,
    #[validate(length(min = 1), nested)]
    pub localizations: Vec<MovieLocalizationInput>,
}

/// A movie together with every localization it owns.
#[derive(Debug, Clone)]
pub struct MovieRecord {
    pub movie: Movie,
    pub localizations: Localizations<MovieLocalization>,
}

impl MovieRecord {
    /// Resolve `requested` against the stored locales and assemble the view.
    pub fn view(&self, requested: &Locale, default: &Locale) -> Result<MovieView, CoreError> {
        let resolution = self.localizations.resolve(requested, default)?;
        if resolution.fallback {
            tracing::debug!(
                uuid = %self.movie.uuid,
                requested = %requested,
                served = %resolution.locale,
                "Serving fallback movie localization"
            );
        }
        MovieView::assemble(self, &resolution.locale)
    }
}

/// Flat movie representation: base fields plus exactly one localization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieView {
    pub uuid: RecordUuid,
    pub version: Version,
    /// Locale actually served, which may differ from the requested one.
    pub locale: String,
    pub tmdb_id: i64,
    pub release_year: Option<i32>,
    pub genres: BTreeMap<i32, String>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_url: Option<String>,
}

impl MovieView {
    /// Combine the base row of `record` with its `locale` variant.
    ///
    /// `locale` is expected to come from the resolver; a locale without a
    /// stored variant is [`CoreError::LocaleNotFound`].
    pub fn assemble(record: &MovieRecord, locale: &Locale) -> Result<Self, CoreError> {
        let localization =
            record
                .localizations
                .get(locale)
                .ok_or_else(|| CoreError::LocaleNotFound {
                    requested: locale.to_string(),
                })?;
        let movie = &record.movie;

        Ok(Self {
            uuid: movie.uuid,
            version: movie.version,
            locale: locale.to_string(),
            tmdb_id: movie.tmdb_id,
            release_year: movie.release_year,
            genres: movie.genres.0.clone(),
            imdb_id: movie.imdb_id.clone(),
            title: localization.title.clone(),
            overview: localization.overview.clone(),
            tagline: localization.tagline.clone(),
            poster_url: localization.poster_url.clone(),
        })
    }
}

impl From<MovieView> for CreateMovie {
    fn from(view: MovieView) -> Self {
        Self {
            uuid: view.uuid,
            movie: MovieFields {
                tmdb_id: view.tmdb_id,
                release_year: view.release_year,
                genres: view.genres,
                imdb_id: view.imdb_id,
            },
            localization: MovieLocalizationInput {
                locale: view.locale,
                title: view.title,
                overview: view.overview,
                tagline: view.tagline,
                poster_url: view.poster_url,
            },
        }
    }
}
