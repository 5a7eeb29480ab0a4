use cinemap_core::error::CoreError;

/// Error type for store operations.
///
/// Caller-facing conditions (not found, uuid in use, version conflict, ...)
/// arrive as [`CoreError`]; anything the database reports is passed through
/// untouched and never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whether `err` is a PostgreSQL unique violation (23505) on `constraint`.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
