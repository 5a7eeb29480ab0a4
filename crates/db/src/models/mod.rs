//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` structs matching the base and localization rows
//! - `Deserialize` + `Validate` input DTOs for create, update and bulk update
//! - The in-memory aggregate (base row plus its variant map)
//! - The flat view assembled from a base row and one resolved variant

pub mod movie;
pub mod scene;

use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::localization::Localizations;

/// Key localization rows by their stored locale.
///
/// The table constraints guarantee one row per locale and a well-formed
/// code; a row that still fails to parse is reported as an internal error.
pub(crate) fn keyed_by_locale<V>(
    rows: Vec<V>,
    locale_of: impl Fn(&V) -> &str,
) -> Result<Localizations<V>, CoreError> {
    rows.into_iter()
        .map(|row| {
            let locale = Locale::parse(locale_of(&row)).map_err(|_| {
                CoreError::Internal(format!("Stored locale '{}' is invalid", locale_of(&row)))
            })?;
            Ok((locale, row))
        })
        .collect()
}
