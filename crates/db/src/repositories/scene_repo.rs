//! Repository for the `scenes` and `scene_localizations` tables.
//!
//! Scene rows are always read joined with `movies` so that callers only ever
//! see the owning movie's uuid, never its surrogate key.

use std::collections::HashMap;

use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::localization::{plan_update, Localizations, UpdateMode, VariantWrite};
use cinemap_core::types::{DbId, RecordUuid};
use sqlx::{PgConnection, PgPool};

use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::keyed_by_locale;
use crate::models::scene::{
    CreateScene, Scene, SceneFields, SceneLocalization, SceneLocalizationInput, SceneRecord,
    UpdateScene, UpdateSceneLocalizations,
};
use crate::repositories::{begin_snapshot, check_expected_version, MovieRepo};

const ENTITY: &str = "Scene";

/// Column list for `scenes s JOIN movies m`.
const COLUMNS: &str = "s.id, s.uuid, s.version, s.movie_id, m.uuid AS movie_uuid, \
    s.latitude, s.longitude, s.created_at, s.updated_at";

/// Column list for the `scene_localizations` table.
const LOCALIZATION_COLUMNS: &str = "id, scene_id, locale, title, description";

fn not_found(uuid: RecordUuid) -> CoreError {
    CoreError::NotFound {
        entity: ENTITY,
        uuid,
    }
}

/// Provides the localized record store and bulk localization updates for scenes.
pub struct SceneRepo;

impl SceneRepo {
    pub async fn exists(pool: &PgPool, uuid: RecordUuid) -> Result<bool, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::exists_in(&mut conn, uuid).await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scenes")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub async fn find_by_uuid(
        pool: &PgPool,
        uuid: RecordUuid,
    ) -> StoreResult<Option<SceneRecord>> {
        let mut tx = begin_snapshot(pool).await?;
        let record = Self::load_record(&mut tx, uuid).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn get(pool: &PgPool, uuid: RecordUuid) -> StoreResult<SceneRecord> {
        Self::find_by_uuid(pool, uuid)
            .await?
            .ok_or_else(|| not_found(uuid).into())
    }

    /// List every scene with its localizations, oldest first.
    pub async fn list(pool: &PgPool) -> StoreResult<Vec<SceneRecord>> {
        let mut tx = begin_snapshot(pool).await?;
        let records = Self::load_records(&mut tx, None).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// List the scenes of one movie. Fails with `NotFound` if the movie is absent.
    pub async fn list_for_movie(
        pool: &PgPool,
        movie_uuid: RecordUuid,
    ) -> StoreResult<Vec<SceneRecord>> {
        let mut tx = begin_snapshot(pool).await?;
        let movie_id = MovieRepo::require_id(&mut tx, movie_uuid).await?;
        let records = Self::load_records(&mut tx, Some(movie_id)).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Insert a new scene under an existing movie with its initial localization.
    pub async fn create(pool: &PgPool, input: &CreateScene) -> StoreResult<SceneRecord> {
        let locale = Locale::parse(&input.localization.locale)?;
        let mut tx = pool.begin().await?;

        if Self::exists_in(&mut tx, input.uuid).await? {
            return Err(CoreError::UuidInUse {
                entity: ENTITY,
                uuid: input.uuid,
            }
            .into());
        }
        let movie_id =
            MovieRepo::require_id_for_reference(&mut tx, input.scene.movie_uuid).await?;

        let query = format!(
            "WITH s AS ( \
                INSERT INTO scenes (uuid, movie_id, latitude, longitude) \
                VALUES ($1, $2, $3, $4) \
                RETURNING * \
             ) \
             SELECT {COLUMNS} FROM s JOIN movies m ON m.id = s.movie_id"
        );
        let scene = sqlx::query_as::<_, Scene>(&query)
            .bind(input.uuid)
            .bind(movie_id)
            .bind(input.scene.latitude)
            .bind(input.scene.longitude)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| uuid_conflict(err, input.uuid))?;

        let localization = Self::insert_localization(&mut tx, scene.id, &input.localization).await?;
        tx.commit().await?;

        tracing::info!(uuid = %scene.uuid, movie_uuid = %scene.movie_uuid, locale = %locale, "Created scene");
        Ok(SceneRecord {
            scene,
            localizations: Localizations::from_iter([(locale, localization)]),
        })
    }

    /// Overwrite the scene fields and upsert the single submitted localization.
    pub async fn update(
        pool: &PgPool,
        uuid: RecordUuid,
        input: &UpdateScene,
    ) -> StoreResult<SceneRecord> {
        Locale::parse(&input.localization.locale)?;
        let mut tx = pool.begin().await?;

        let current = Self::load_scene(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;
        check_expected_version(ENTITY, uuid, input.version, current.version)?;

        let scene = Self::persist(&mut tx, &current, Some(&input.scene)).await?;
        Self::upsert_localization(&mut tx, scene.id, &input.localization).await?;
        let localizations = Self::load_localizations(&mut tx, scene.id).await?;
        tx.commit().await?;

        tracing::info!(%uuid, version = scene.version, locale = %input.localization.locale, "Updated scene");
        Ok(SceneRecord {
            scene,
            localizations,
        })
    }

    /// Delete a scene and its localizations in one transaction.
    pub async fn delete(pool: &PgPool, uuid: RecordUuid) -> StoreResult<()> {
        let mut tx = pool.begin().await?;

        let scene = Self::lock_scene(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;

        let localizations = sqlx::query("DELETE FROM scene_localizations WHERE scene_id = $1")
            .bind(scene.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM scenes WHERE id = $1")
            .bind(scene.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%uuid, localizations, "Deleted scene");
        Ok(())
    }

    /// Delete every scene and all scene localizations. Returns the number of scenes removed.
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let deleted = Self::delete_all_in(&mut tx).await?;
        tx.commit().await?;
        tracing::info!(deleted, "Deleted all scenes");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Localization set
    // -----------------------------------------------------------------------

    /// All localizations of a scene, ordered by locale.
    pub async fn list_localizations(
        pool: &PgPool,
        uuid: RecordUuid,
    ) -> StoreResult<Vec<SceneLocalization>> {
        let record = Self::get(pool, uuid).await?;
        if record.localizations.is_empty() {
            return Err(CoreError::NoLocalizationsFound {
                entity: ENTITY,
                uuid,
            }
            .into());
        }
        Ok(record
            .localizations
            .into_iter()
            .map(|(_, row)| row)
            .collect())
    }

    /// Apply a bulk localization update in merge or override mode.
    pub async fn update_localizations(
        pool: &PgPool,
        uuid: RecordUuid,
        input: &UpdateSceneLocalizations,
        mode: UpdateMode,
    ) -> StoreResult<SceneRecord> {
        let submitted = input
            .localizations
            .iter()
            .map(|entry| Locale::parse(&entry.locale))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = pool.begin().await?;

        let current = Self::load_record(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;
        check_expected_version(ENTITY, uuid, input.version, current.scene.version)?;
        let plan = plan_update(current.localizations.locales(), &submitted, mode)?;

        let scene = Self::persist(&mut tx, &current.scene, None).await?;

        if plan.clear_existing {
            sqlx::query("DELETE FROM scene_localizations WHERE scene_id = $1")
                .bind(scene.id)
                .execute(&mut *tx)
                .await?;
        }
        for (write, entry) in plan.writes.iter().zip(&input.localizations) {
            match write {
                VariantWrite::Insert(_) => {
                    Self::insert_localization(&mut tx, scene.id, entry).await?;
                }
                VariantWrite::Replace(_) => {
                    Self::replace_localization(&mut tx, scene.id, entry).await?;
                }
            }
        }

        let localizations = Self::load_localizations(&mut tx, scene.id).await?;
        tx.commit().await?;

        tracing::info!(
            %uuid,
            ?mode,
            version = scene.version,
            inserted = plan.inserts(),
            replaced = plan.replacements(),
            "Updated scene localizations"
        );
        Ok(SceneRecord {
            scene,
            localizations,
        })
    }

    // -----------------------------------------------------------------------
    // Cascade helpers (called from MovieRepo inside its transaction)
    // -----------------------------------------------------------------------

    /// Delete all scenes of a movie and their localizations.
    ///
    /// The scene rows are locked first, so localization writes already in
    /// flight commit before the localization rows are deleted.
    pub(crate) async fn delete_for_movie(
        conn: &mut PgConnection,
        movie_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("SELECT id FROM scenes WHERE movie_id = $1 FOR UPDATE")
            .bind(movie_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "DELETE FROM scene_localizations \
             WHERE scene_id IN (SELECT id FROM scenes WHERE movie_id = $1)",
        )
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;
        let result = sqlx::query("DELETE FROM scenes WHERE movie_id = $1")
            .bind(movie_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every scene and scene localization.
    pub(crate) async fn delete_all_in(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        sqlx::query("LOCK TABLE scenes, scene_localizations IN EXCLUSIVE MODE")
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM scene_localizations")
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query("DELETE FROM scenes")
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn exists_in(conn: &mut PgConnection, uuid: RecordUuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM scenes WHERE uuid = $1)")
                .bind(uuid)
                .fetch_one(&mut *conn)
                .await?;
        Ok(exists)
    }

    async fn load_scene(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> Result<Option<Scene>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes s JOIN movies m ON m.id = s.movie_id \
             WHERE s.uuid = $1"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load a scene and hold its row lock until the transaction ends.
    async fn lock_scene(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> Result<Option<Scene>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes s JOIN movies m ON m.id = s.movie_id \
             WHERE s.uuid = $1 \
             FOR UPDATE OF s"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn load_localizations(
        conn: &mut PgConnection,
        scene_id: DbId,
    ) -> StoreResult<Localizations<SceneLocalization>> {
        let query = format!(
            "SELECT {LOCALIZATION_COLUMNS} FROM scene_localizations \
             WHERE scene_id = $1 \
             ORDER BY locale"
        );
        let rows = sqlx::query_as::<_, SceneLocalization>(&query)
            .bind(scene_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(keyed_by_locale(rows, |r| r.locale.as_str())?)
    }

    async fn load_record(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> StoreResult<Option<SceneRecord>> {
        let Some(scene) = Self::load_scene(conn, uuid).await? else {
            return Ok(None);
        };
        let localizations = Self::load_localizations(conn, scene.id).await?;
        Ok(Some(SceneRecord {
            scene,
            localizations,
        }))
    }

    /// Load scenes (all, or those of one movie) with their localizations.
    async fn load_records(
        conn: &mut PgConnection,
        movie_id: Option<DbId>,
    ) -> StoreResult<Vec<SceneRecord>> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes s JOIN movies m ON m.id = s.movie_id \
             WHERE ($1::BIGINT IS NULL OR s.movie_id = $1) \
             ORDER BY s.id"
        );
        let scenes = sqlx::query_as::<_, Scene>(&query)
            .bind(movie_id)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<DbId> = scenes.iter().map(|s| s.id).collect();
        let query = format!(
            "SELECT {LOCALIZATION_COLUMNS} FROM scene_localizations \
             WHERE scene_id = ANY($1) \
             ORDER BY scene_id, locale"
        );
        let rows = sqlx::query_as::<_, SceneLocalization>(&query)
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut by_scene: HashMap<DbId, Vec<SceneLocalization>> = HashMap::new();
        for row in rows {
            by_scene.entry(row.scene_id).or_default().push(row);
        }

        scenes
            .into_iter()
            .map(|scene| {
                let rows = by_scene.remove(&scene.id).unwrap_or_default();
                let localizations = keyed_by_locale(rows, |r| r.locale.as_str())?;
                Ok(SceneRecord {
                    scene,
                    localizations,
                })
            })
            .collect()
    }

    /// Compare-and-swap the version loaded as `current`, optionally
    /// overwriting the scene fields in the same statement.
    async fn persist(
        conn: &mut PgConnection,
        current: &Scene,
        fields: Option<&SceneFields>,
    ) -> StoreResult<Scene> {
        let updated = match fields {
            Some(fields) => {
                let movie_id =
                    MovieRepo::require_id_for_reference(conn, fields.movie_uuid).await?;
                let query = format!(
                    "WITH s AS ( \
                        UPDATE scenes SET \
                            movie_id = $3, \
                            latitude = $4, \
                            longitude = $5, \
                            version = version + 1 \
                        WHERE id = $1 AND version = $2 \
                        RETURNING * \
                     ) \
                     SELECT {COLUMNS} FROM s JOIN movies m ON m.id = s.movie_id"
                );
                sqlx::query_as::<_, Scene>(&query)
                    .bind(current.id)
                    .bind(current.version)
                    .bind(movie_id)
                    .bind(fields.latitude)
                    .bind(fields.longitude)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            None => {
                let query = format!(
                    "WITH s AS ( \
                        UPDATE scenes SET version = version + 1 \
                        WHERE id = $1 AND version = $2 \
                        RETURNING * \
                     ) \
                     SELECT {COLUMNS} FROM s JOIN movies m ON m.id = s.movie_id"
                );
                sqlx::query_as::<_, Scene>(&query)
                    .bind(current.id)
                    .bind(current.version)
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };

        if let Some(scene) = updated {
            return Ok(scene);
        }
        if !Self::exists_in(conn, current.uuid).await? {
            return Err(not_found(current.uuid).into());
        }

        tracing::warn!(uuid = %current.uuid, expected = current.version, "Scene version moved on");
        Err(CoreError::VersionConflict {
            entity: ENTITY,
            uuid: current.uuid,
            expected: current.version,
        }
        .into())
    }

    async fn insert_localization(
        conn: &mut PgConnection,
        scene_id: DbId,
        input: &SceneLocalizationInput,
    ) -> Result<SceneLocalization, sqlx::Error> {
        let query = format!(
            "INSERT INTO scene_localizations (scene_id, locale, title, description) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {LOCALIZATION_COLUMNS}"
        );
        sqlx::query_as::<_, SceneLocalization>(&query)
            .bind(scene_id)
            .bind(&input.locale)
            .bind(&input.title)
            .bind(&input.description)
            .fetch_one(&mut *conn)
            .await
    }

    async fn replace_localization(
        conn: &mut PgConnection,
        scene_id: DbId,
        input: &SceneLocalizationInput,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE scene_localizations SET title = $3, description = $4 \
             WHERE scene_id = $1 AND locale = $2",
        )
        .bind(scene_id)
        .bind(&input.locale)
        .bind(&input.title)
        .bind(&input.description)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn upsert_localization(
        conn: &mut PgConnection,
        scene_id: DbId,
        input: &SceneLocalizationInput,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO scene_localizations (scene_id, locale, title, description) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_scene_localizations_scene_locale DO UPDATE SET \
                title = EXCLUDED.title, \
                description = EXCLUDED.description",
        )
        .bind(scene_id)
        .bind(&input.locale)
        .bind(&input.title)
        .bind(&input.description)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn uuid_conflict(err: sqlx::Error, uuid: RecordUuid) -> StoreError {
    if is_unique_violation(&err, "uq_scenes_uuid") {
        CoreError::UuidInUse {
            entity: ENTITY,
            uuid,
        }
        .into()
    } else {
        err.into()
    }
}
