/// Internal surrogate keys are PostgreSQL BIGSERIAL. Never exposed for identity.
pub type DbId = i64;

/// Externally visible record identifiers.
pub type RecordUuid = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Optimistic concurrency counter stored on every base record.
pub type Version = i32;
