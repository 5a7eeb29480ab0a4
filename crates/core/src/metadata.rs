//! Contract for the external movie metadata source.
//!
//! The source is an opaque producer of initial record data: base fields plus
//! one localized variant, keyed by the external catalog (TMDB) id. Any
//! failure it reports surfaces as [`CoreError::MetadataUnavailable`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::locale::Locale;

/// Locale-independent movie fields as delivered by the metadata source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub tmdb_id: i64,
    pub release_year: Option<i32>,
    #[serde(default)]
    pub genres: BTreeMap<i32, String>,
    pub imdb_id: Option<String>,
    pub localization: LocalizedMetadata,
}

/// The single localized variant delivered with [`MovieMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedMetadata {
    pub locale: Locale,
    pub title: String,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_url: Option<String>,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch base fields and one variant for `tmdb_id`, preferably in `locale`.
    async fn fetch_movie(&self, tmdb_id: i64, locale: &Locale) -> Result<MovieMetadata, CoreError>;
}
