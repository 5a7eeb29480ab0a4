//! Shared query parameter types for API handlers.

use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::localization::UpdateMode;
use serde::Deserialize;

/// `?locale=` on read endpoints.
#[derive(Debug, Deserialize)]
pub struct LocaleParams {
    pub locale: Option<String>,
}

impl LocaleParams {
    /// The requested locale, or `default` when the parameter is absent.
    ///
    /// A present but malformed code is a validation error, raised before any
    /// store access.
    pub fn requested(&self, default: &Locale) -> Result<Locale, CoreError> {
        match &self.locale {
            Some(code) => Locale::parse(code),
            None => Ok(default.clone()),
        }
    }
}

/// `?override=` on bulk localization updates (default `false`).
#[derive(Debug, Deserialize)]
pub struct OverrideParams {
    #[serde(rename = "override", default)]
    pub replace: bool,
}

impl OverrideParams {
    pub fn mode(&self) -> UpdateMode {
        UpdateMode::from_override_flag(self.replace)
    }
}
