//! Repository for the `movies` and `movie_localizations` tables.

use std::collections::HashMap;

use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::localization::{plan_update, Localizations, UpdateMode, VariantWrite};
use cinemap_core::types::{DbId, RecordUuid};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::keyed_by_locale;
use crate::models::movie::{
    CreateMovie, Movie, MovieFields, MovieLocalization, MovieLocalizationInput, MovieRecord,
    UpdateMovie, UpdateMovieLocalizations,
};
use crate::repositories::{begin_snapshot, check_expected_version, SceneRepo};

const ENTITY: &str = "Movie";

/// Column list for the `movies` table.
const COLUMNS: &str = "id, uuid, version, tmdb_id, release_year, genres, imdb_id, \
    created_at, updated_at";

/// Column list for the `movie_localizations` table.
const LOCALIZATION_COLUMNS: &str = "id, movie_id, locale, title, overview, tagline, poster_url";

fn not_found(uuid: RecordUuid) -> CoreError {
    CoreError::NotFound {
        entity: ENTITY,
        uuid,
    }
}

/// Provides the localized record store and bulk localization updates for movies.
pub struct MovieRepo;

impl MovieRepo {
    /// Whether a movie with this uuid exists. No side effects.
    pub async fn exists(pool: &PgPool, uuid: RecordUuid) -> Result<bool, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::exists_in(&mut conn, uuid).await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Find a movie and all of its localizations.
    pub async fn find_by_uuid(
        pool: &PgPool,
        uuid: RecordUuid,
    ) -> StoreResult<Option<MovieRecord>> {
        let mut tx = begin_snapshot(pool).await?;
        let record = Self::load_record(&mut tx, uuid).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Like [`MovieRepo::find_by_uuid`], failing with `NotFound` when absent.
    pub async fn get(pool: &PgPool, uuid: RecordUuid) -> StoreResult<MovieRecord> {
        Self::find_by_uuid(pool, uuid)
            .await?
            .ok_or_else(|| not_found(uuid).into())
    }

    /// List every movie with its localizations, oldest first.
    pub async fn list(pool: &PgPool) -> StoreResult<Vec<MovieRecord>> {
        let mut tx = begin_snapshot(pool).await?;

        let query = format!("SELECT {COLUMNS} FROM movies ORDER BY id");
        let movies = sqlx::query_as::<_, Movie>(&query)
            .fetch_all(&mut *tx)
            .await?;

        let ids: Vec<DbId> = movies.iter().map(|m| m.id).collect();
        let query = format!(
            "SELECT {LOCALIZATION_COLUMNS} FROM movie_localizations \
             WHERE movie_id = ANY($1) \
             ORDER BY movie_id, locale"
        );
        let rows = sqlx::query_as::<_, MovieLocalization>(&query)
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut by_movie: HashMap<DbId, Vec<MovieLocalization>> = HashMap::new();
        for row in rows {
            by_movie.entry(row.movie_id).or_default().push(row);
        }

        movies
            .into_iter()
            .map(|movie| {
                let rows = by_movie.remove(&movie.id).unwrap_or_default();
                let localizations = keyed_by_locale(rows, |r| r.locale.as_str())?;
                Ok(MovieRecord {
                    movie,
                    localizations,
                })
            })
            .collect()
    }

    /// Insert a new movie with its initial localization.
    ///
    /// Fails with `UuidInUse` if the uuid is already taken, including when a
    /// concurrent create wins the race past the existence check.
    pub async fn create(pool: &PgPool, input: &CreateMovie) -> StoreResult<MovieRecord> {
        let locale = Locale::parse(&input.localization.locale)?;
        let mut tx = pool.begin().await?;

        if Self::exists_in(&mut tx, input.uuid).await? {
            return Err(CoreError::UuidInUse {
                entity: ENTITY,
                uuid: input.uuid,
            }
            .into());
        }

        let query = format!(
            "INSERT INTO movies (uuid, tmdb_id, release_year, genres, imdb_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let movie = sqlx::query_as::<_, Movie>(&query)
            .bind(input.uuid)
            .bind(input.movie.tmdb_id)
            .bind(input.movie.release_year)
            .bind(Json(&input.movie.genres))
            .bind(&input.movie.imdb_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| uuid_conflict(err, input.uuid))?;

        let localization = Self::insert_localization(&mut tx, movie.id, &input.localization).await?;
        tx.commit().await?;

        tracing::info!(uuid = %movie.uuid, locale = %locale, "Created movie");
        Ok(MovieRecord {
            movie,
            localizations: Localizations::from_iter([(locale, localization)]),
        })
    }

    /// Overwrite the base fields and upsert the single submitted localization.
    ///
    /// Other localizations are left untouched. The version advances by one.
    pub async fn update(
        pool: &PgPool,
        uuid: RecordUuid,
        input: &UpdateMovie,
    ) -> StoreResult<MovieRecord> {
        Locale::parse(&input.localization.locale)?;
        let mut tx = pool.begin().await?;

        let current = Self::load_movie(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;
        check_expected_version(ENTITY, uuid, input.version, current.version)?;

        let movie = Self::persist(&mut tx, &current, Some(&input.movie)).await?;
        Self::upsert_localization(&mut tx, movie.id, &input.localization).await?;
        let localizations = Self::load_localizations(&mut tx, movie.id).await?;
        tx.commit().await?;

        tracing::info!(
            %uuid,
            version = movie.version,
            locale = %input.localization.locale,
            "Updated movie"
        );
        Ok(MovieRecord {
            movie,
            localizations,
        })
    }

    /// Delete a movie, its localizations and its scenes in one transaction.
    pub async fn delete(pool: &PgPool, uuid: RecordUuid) -> StoreResult<()> {
        let mut tx = pool.begin().await?;

        let movie = Self::lock_movie(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;

        let scenes = SceneRepo::delete_for_movie(&mut tx, movie.id).await?;
        let localizations = sqlx::query("DELETE FROM movie_localizations WHERE movie_id = $1")
            .bind(movie.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(movie.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(%uuid, scenes, localizations, "Deleted movie");
        Ok(())
    }

    /// Delete every movie together with all localizations and scenes.
    ///
    /// Returns the number of movies removed.
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Plain reads proceed; writers and row lockers wait for the commit.
        sqlx::query("LOCK TABLE movies, movie_localizations IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        SceneRepo::delete_all_in(&mut tx).await?;
        sqlx::query("DELETE FROM movie_localizations")
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM movies")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        tracing::info!(deleted, "Deleted all movies");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Localization set
    // -----------------------------------------------------------------------

    /// All localizations of a movie, ordered by locale.
    ///
    /// Fails with `NotFound` if the movie is absent and with
    /// `NoLocalizationsFound` if it exists without any localization.
    pub async fn list_localizations(
        pool: &PgPool,
        uuid: RecordUuid,
    ) -> StoreResult<Vec<MovieLocalization>> {
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
    ///
    /// Override drops every stored localization before inserting the
    /// submitted ones; merge replaces submitted locales in place and inserts
    /// new ones. Either way the version advances by exactly one.
    pub async fn update_localizations(
        pool: &PgPool,
        uuid: RecordUuid,
        input: &UpdateMovieLocalizations,
        mode: UpdateMode,
    ) -> StoreResult<MovieRecord> {
        let submitted = input
            .localizations
            .iter()
            .map(|entry| Locale::parse(&entry.locale))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = pool.begin().await?;

        let current = Self::load_record(&mut tx, uuid)
            .await?
            .ok_or_else(|| not_found(uuid))?;
        check_expected_version(ENTITY, uuid, input.version, current.movie.version)?;
        let plan = plan_update(current.localizations.locales(), &submitted, mode)?;

        let movie = Self::persist(&mut tx, &current.movie, None).await?;

        if plan.clear_existing {
            sqlx::query("DELETE FROM movie_localizations WHERE movie_id = $1")
                .bind(movie.id)
                .execute(&mut *tx)
                .await?;
        }
        for (write, entry) in plan.writes.iter().zip(&input.localizations) {
            match write {
                VariantWrite::Insert(_) => {
                    Self::insert_localization(&mut tx, movie.id, entry).await?;
                }
                VariantWrite::Replace(_) => {
                    Self::replace_localization(&mut tx, movie.id, entry).await?;
                }
            }
        }

        let localizations = Self::load_localizations(&mut tx, movie.id).await?;
        tx.commit().await?;

        tracing::info!(
            %uuid,
            ?mode,
            version = movie.version,
            inserted = plan.inserts(),
            replaced = plan.replacements(),
            "Updated movie localizations"
        );
        Ok(MovieRecord {
            movie,
            localizations,
        })
    }

    // -----------------------------------------------------------------------
    // Crate-internal helpers
    // -----------------------------------------------------------------------

    /// Resolve a movie uuid to its surrogate key within a transaction.
    pub(crate) async fn require_id(conn: &mut PgConnection, uuid: RecordUuid) -> StoreResult<DbId> {
        let row: Option<(DbId,)> = sqlx::query_as("SELECT id FROM movies WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|(id,)| id).ok_or_else(|| not_found(uuid).into())
    }

    /// Resolve a movie uuid for a write that will reference it.
    ///
    /// Holds a key-share lock until the transaction ends, so the movie
    /// cannot be deleted underneath the new reference. A delete already in
    /// flight is waited for and then reported as `NotFound`.
    pub(crate) async fn require_id_for_reference(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> StoreResult<DbId> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM movies WHERE uuid = $1 FOR KEY SHARE")
                .bind(uuid)
                .fetch_optional(&mut *conn)
                .await?;
        row.map(|(id,)| id).ok_or_else(|| not_found(uuid).into())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn exists_in(conn: &mut PgConnection, uuid: RecordUuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM movies WHERE uuid = $1)")
                .bind(uuid)
                .fetch_one(&mut *conn)
                .await?;
        Ok(exists)
    }

    async fn load_movie(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> Result<Option<Movie>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM movies WHERE uuid = $1");
        sqlx::query_as::<_, Movie>(&query)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load a movie and hold its row lock until the transaction ends.
    ///
    /// Writers that already touched the row are waited for, so their
    /// localizations are visible to the statements that follow.
    async fn lock_movie(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> Result<Option<Movie>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM movies WHERE uuid = $1 FOR UPDATE");
        sqlx::query_as::<_, Movie>(&query)
            .bind(uuid)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn load_localizations(
        conn: &mut PgConnection,
        movie_id: DbId,
    ) -> StoreResult<Localizations<MovieLocalization>> {
        let query = format!(
            "SELECT {LOCALIZATION_COLUMNS} FROM movie_localizations \
             WHERE movie_id = $1 \
             ORDER BY locale"
        );
        let rows = sqlx::query_as::<_, MovieLocalization>(&query)
            .bind(movie_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(keyed_by_locale(rows, |r| r.locale.as_str())?)
    }

    async fn load_record(
        conn: &mut PgConnection,
        uuid: RecordUuid,
    ) -> StoreResult<Option<MovieRecord>> {
        let Some(movie) = Self::load_movie(conn, uuid).await? else {
            return Ok(None);
        };
        let localizations = Self::load_localizations(conn, movie.id).await?;
        Ok(Some(MovieRecord {
            movie,
            localizations,
        }))
    }

    /// Compare-and-swap the version loaded as `current`, optionally
    /// overwriting the base fields in the same statement.
    async fn persist(
        conn: &mut PgConnection,
        current: &Movie,
        fields: Option<&MovieFields>,
    ) -> StoreResult<Movie> {
        let updated = match fields {
            Some(fields) => {
                let query = format!(
                    "UPDATE movies SET \
                        tmdb_id = $3, \
                        release_year = $4, \
                        genres = $5, \
                        imdb_id = $6, \
                        version = version + 1 \
                     WHERE id = $1 AND version = $2 \
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, Movie>(&query)
                    .bind(current.id)
                    .bind(current.version)
                    .bind(fields.tmdb_id)
                    .bind(fields.release_year)
                    .bind(Json(&fields.genres))
                    .bind(&fields.imdb_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            None => {
                let query = format!(
                    "UPDATE movies SET version = version + 1 \
                     WHERE id = $1 AND version = $2 \
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, Movie>(&query)
                    .bind(current.id)
                    .bind(current.version)
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };

        if let Some(movie) = updated {
            return Ok(movie);
        }
        if !Self::exists_in(conn, current.uuid).await? {
            return Err(not_found(current.uuid).into());
        }

        tracing::warn!(uuid = %current.uuid, expected = current.version, "Movie version moved on");
        Err(CoreError::VersionConflict {
            entity: ENTITY,
            uuid: current.uuid,
            expected: current.version,
        }
        .into())
    }

    async fn insert_localization(
        conn: &mut PgConnection,
        movie_id: DbId,
        input: &MovieLocalizationInput,
    ) -> Result<MovieLocalization, sqlx::Error> {
        let query = format!(
            "INSERT INTO movie_localizations \
                (movie_id, locale, title, overview, tagline, poster_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {LOCALIZATION_COLUMNS}"
        );
        sqlx::query_as::<_, MovieLocalization>(&query)
            .bind(movie_id)
            .bind(&input.locale)
            .bind(&input.title)
            .bind(&input.overview)
            .bind(&input.tagline)
            .bind(&input.poster_url)
            .fetch_one(&mut *conn)
            .await
    }

    async fn replace_localization(
        conn: &mut PgConnection,
        movie_id: DbId,
        input: &MovieLocalizationInput,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE movie_localizations SET \
                title = $3, overview = $4, tagline = $5, poster_url = $6 \
             WHERE movie_id = $1 AND locale = $2",
        )
        .bind(movie_id)
        .bind(&input.locale)
        .bind(&input.title)
        .bind(&input.overview)
        .bind(&input.tagline)
        .bind(&input.poster_url)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Replace the localization for `input.locale` if stored, insert otherwise.
    async fn upsert_localization(
        conn: &mut PgConnection,
        movie_id: DbId,
        input: &MovieLocalizationInput,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO movie_localizations \
                (movie_id, locale, title, overview, tagline, poster_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_movie_localizations_movie_locale DO UPDATE SET \
                title = EXCLUDED.title, \
                overview = EXCLUDED.overview, \
                tagline = EXCLUDED.tagline, \
                poster_url = EXCLUDED.poster_url",
        )
        .bind(movie_id)
        .bind(&input.locale)
        .bind(&input.title)
        .bind(&input.overview)
        .bind(&input.tagline)
        .bind(&input.poster_url)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Map a unique violation on the uuid constraint to `UuidInUse`.
fn uuid_conflict(err: sqlx::Error, uuid: RecordUuid) -> StoreError {
    if is_unique_violation(&err, "uq_movies_uuid") {
        CoreError::UuidInUse {
            entity: ENTITY,
            uuid,
        }
        .into()
    } else {
        err.into()
    }
}
