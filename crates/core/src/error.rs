use crate::types::{RecordUuid, Version};

/// Caller-facing domain errors.
///
/// Every variant is an expected condition that the transport layer maps to a
/// typed response. Store failures (connectivity, I/O) never pass through
/// here; they travel next to `CoreError` in the store's own error type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with uuid {uuid}")]
    NotFound {
        entity: &'static str,
        uuid: RecordUuid,
    },

    #[error("No localizations found for {entity} with uuid {uuid}")]
    NoLocalizationsFound {
        entity: &'static str,
        uuid: RecordUuid,
    },

    #[error("No localization available for requested locale '{requested}'")]
    LocaleNotFound { requested: String },

    #[error("{entity} uuid {uuid} is already in use")]
    UuidInUse {
        entity: &'static str,
        uuid: RecordUuid,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Version conflict: {entity} {uuid} is no longer at version {expected}")]
    VersionConflict {
        entity: &'static str,
        uuid: RecordUuid,
        expected: Version,
    },

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
