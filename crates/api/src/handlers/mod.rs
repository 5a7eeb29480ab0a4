pub mod movie;
pub mod scene;

use cinemap_core::error::CoreError;
use cinemap_core::types::{RecordUuid, Version};
use serde::Serialize;

/// Parse a record uuid taken from the request path.
pub(crate) fn parse_uuid(raw: &str) -> Result<RecordUuid, CoreError> {
    RecordUuid::parse_str(raw)
        .map_err(|e| CoreError::Validation(format!("Invalid uuid '{raw}': {e}")))
}

/// Response body of a bulk localization update.
#[derive(Debug, Serialize)]
pub struct LocalizationSet<T: Serialize> {
    pub uuid: RecordUuid,
    pub version: Version,
    pub localizations: Vec<T>,
}
