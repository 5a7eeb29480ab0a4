//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async operations that
//! accept `&PgPool` as the first argument. Every mutating operation runs in
//! one transaction and advances the record's version by exactly one through
//! a compare-and-swap on the version loaded in that transaction.

pub mod movie_repo;
pub mod scene_repo;

pub use movie_repo::MovieRepo;
pub use scene_repo::SceneRepo;

use cinemap_core::error::CoreError;
use cinemap_core::types::{RecordUuid, Version};
use sqlx::{PgPool, Postgres, Transaction};

/// Begin a read-only transaction that sees one snapshot across statements.
///
/// Aggregates are read with several statements (base rows, then
/// localizations) which must all observe the same committed state.
pub(crate) async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Reject a write whose caller-supplied version no longer matches the store.
pub(crate) fn check_expected_version(
    entity: &'static str,
    uuid: RecordUuid,
    expected: Option<Version>,
    actual: Version,
) -> Result<(), CoreError> {
    match expected {
        Some(expected) if expected != actual => {
            tracing::warn!(entity, %uuid, expected, actual, "Stale write rejected");
            Err(CoreError::VersionConflict {
                entity,
                uuid,
                expected,
            })
        }
        _ => Ok(()),
    }
}
