//! Offline metadata catalog.
//!
//! [`CatalogMetadataSource`] answers imports from an in-memory table keyed by
//! TMDB id and locale, optionally seeded from a JSON file holding an array of
//! [`MovieMetadata`] entries (one per id and locale).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::metadata::{MetadataSource, MovieMetadata};

#[derive(Debug, Default)]
pub struct CatalogMetadataSource {
    entries: HashMap<(i64, Locale), MovieMetadata>,
}

impl CatalogMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for the id and locale carried by `metadata`.
    pub fn insert(&mut self, metadata: MovieMetadata) {
        let key = (metadata.tmdb_id, metadata.localization.locale.clone());
        self.entries.insert(key, metadata);
    }

    pub fn with_movie(mut self, metadata: MovieMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON array of metadata entries.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let entries: Vec<MovieMetadata> = serde_json::from_str(json)
            .map_err(|e| CoreError::MetadataUnavailable(format!("Invalid catalog JSON: {e}")))?;
        Ok(entries
            .into_iter()
            .fold(Self::new(), |catalog, entry| catalog.with_movie(entry)))
    }

    /// Read and parse a catalog file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            CoreError::MetadataUnavailable(format!(
                "Cannot read catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

#[async_trait]
impl MetadataSource for CatalogMetadataSource {
    async fn fetch_movie(&self, tmdb_id: i64, locale: &Locale) -> Result<MovieMetadata, CoreError> {
        self.entries
            .get(&(tmdb_id, locale.clone()))
            .cloned()
            .ok_or_else(|| {
                CoreError::MetadataUnavailable(format!(
                    "No catalog entry for TMDB id {tmdb_id} in locale '{locale}'"
                ))
            })
    }
}
