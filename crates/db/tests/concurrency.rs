//! Integration tests for writes that interleave with an open transaction.
//!
//! Each test leaves a raw transaction open on one connection, starts a
//! repository call on another, waits until that call is blocked on a lock,
//! then commits and checks the typed outcome.

use std::time::Duration;

use assert_matches::assert_matches;
use cinemap_core::error::CoreError;
use cinemap_core::locale::Locale;
use cinemap_core::localization::UpdateMode;
use cinemap_db::models::movie::{
    CreateMovie, MovieFields, MovieLocalizationInput, UpdateMovieLocalizations,
};
use cinemap_db::models::scene::{
    CreateScene, SceneFields, SceneLocalizationInput, UpdateSceneLocalizations,
};
use cinemap_db::repositories::{MovieRepo, SceneRepo};
use cinemap_db::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_movie(pool: &PgPool) -> Uuid {
    let uuid = Uuid::new_v4();
    MovieRepo::create(
        pool,
        &CreateMovie {
            uuid,
            movie: MovieFields {
                tmdb_id: 581,
                release_year: Some(1990),
                genres: Default::default(),
                imdb_id: None,
            },
            localization: MovieLocalizationInput {
                locale: "en".to_string(),
                title: "Dances with Wolves".to_string(),
                overview: None,
                tagline: None,
                poster_url: None,
            },
        },
    )
    .await
    .unwrap();
    uuid
}

fn new_scene(uuid: Uuid, movie_uuid: Uuid) -> CreateScene {
    CreateScene {
        uuid,
        scene: SceneFields {
            movie_uuid,
            latitude: 44.08,
            longitude: -103.23,
        },
        localization: SceneLocalizationInput {
            locale: "en".to_string(),
            title: "Fort Sedgwick".to_string(),
            description: None,
        },
    }
}

/// Poll until some session of this test database is waiting on a lock.
async fn wait_until_blocked(pool: &PgPool) {
    for _ in 0..250 {
        let (waiting,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pg_stat_activity \
             WHERE datname = current_database() AND wait_event_type = 'Lock'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        if waiting > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no session blocked on a lock");
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

// ---------------------------------------------------------------------------
// Test: deletes wait for in-flight child writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_movie_delete_waits_for_in_flight_localization_write(pool: PgPool) {
    let uuid = seed_movie(&pool).await;

    // Same statements as a merge that adds "de".
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE movies SET version = version + 1 WHERE uuid = $1")
        .bind(uuid)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO movie_localizations (movie_id, locale, title) \
         SELECT id, 'de', 'Der mit dem Wolf tanzt' FROM movies WHERE uuid = $1",
    )
    .bind(uuid)
    .execute(&mut *tx)
    .await
    .unwrap();

    let delete = tokio::spawn({
        let pool = pool.clone();
        async move { MovieRepo::delete(&pool, uuid).await }
    });
    wait_until_blocked(&pool).await;
    tx.commit().await.unwrap();

    delete.await.unwrap().unwrap();
    assert!(!MovieRepo::exists(&pool, uuid).await.unwrap());
    assert_eq!(count(&pool, "movie_localizations").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_movie_delete_waits_for_in_flight_scene_localization_write(pool: PgPool) {
    let movie_uuid = seed_movie(&pool).await;
    let scene_uuid = Uuid::new_v4();
    SceneRepo::create(&pool, &new_scene(scene_uuid, movie_uuid))
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE scenes SET version = version + 1 WHERE uuid = $1")
        .bind(scene_uuid)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO scene_localizations (scene_id, locale, title) \
         SELECT id, 'de', 'Fort Sedgwick (de)' FROM scenes WHERE uuid = $1",
    )
    .bind(scene_uuid)
    .execute(&mut *tx)
    .await
    .unwrap();

    let delete = tokio::spawn({
        let pool = pool.clone();
        async move { MovieRepo::delete(&pool, movie_uuid).await }
    });
    wait_until_blocked(&pool).await;
    tx.commit().await.unwrap();

    delete.await.unwrap().unwrap();
    assert_eq!(count(&pool, "scenes").await, 0);
    assert_eq!(count(&pool, "scene_localizations").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_scene_create_during_movie_delete_is_not_found(pool: PgPool) {
    let movie_uuid = seed_movie(&pool).await;

    // A movie delete that has removed its rows but not yet committed.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM movies WHERE uuid = $1 FOR UPDATE")
        .bind(movie_uuid)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query(
        "DELETE FROM movie_localizations \
         WHERE movie_id = (SELECT id FROM movies WHERE uuid = $1)",
    )
    .bind(movie_uuid)
    .execute(&mut *tx)
    .await
    .unwrap();
    sqlx::query("DELETE FROM movies WHERE uuid = $1")
        .bind(movie_uuid)
        .execute(&mut *tx)
        .await
        .unwrap();

    let create = tokio::spawn({
        let pool = pool.clone();
        async move { SceneRepo::create(&pool, &new_scene(Uuid::new_v4(), movie_uuid)).await }
    });
    wait_until_blocked(&pool).await;
    tx.commit().await.unwrap();

    assert_matches!(
        create.await.unwrap(),
        Err(StoreError::Core(CoreError::NotFound { entity: "Movie", .. }))
    );
    assert_eq!(count(&pool, "scenes").await, 0);
}

// ---------------------------------------------------------------------------
// Test: compare-and-swap without a caller-supplied version
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_movie_bulk_update_loses_to_concurrent_version_bump(pool: PgPool) {
    let uuid = seed_movie(&pool).await;

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE movies SET version = version + 1 WHERE uuid = $1")
        .bind(uuid)
        .execute(&mut *tx)
        .await
        .unwrap();

    let update = tokio::spawn({
        let pool = pool.clone();
        async move {
            let input = UpdateMovieLocalizations {
                version: None,
                localizations: vec![MovieLocalizationInput {
                    locale: "de".to_string(),
                    title: "Der mit dem Wolf tanzt".to_string(),
                    overview: None,
                    tagline: None,
                    poster_url: None,
                }],
            };
            MovieRepo::update_localizations(&pool, uuid, &input, UpdateMode::Merge).await
        }
    });
    wait_until_blocked(&pool).await;
    tx.commit().await.unwrap();

    assert_matches!(
        update.await.unwrap(),
        Err(StoreError::Core(CoreError::VersionConflict { entity: "Movie", expected: 0, .. }))
    );

    let record = MovieRepo::get(&pool, uuid).await.unwrap();
    assert_eq!(record.movie.version, 1);
    assert_eq!(record.localizations.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_scene_bulk_update_loses_to_concurrent_version_bump(pool: PgPool) {
    let movie_uuid = seed_movie(&pool).await;
    let uuid = Uuid::new_v4();
    SceneRepo::create(&pool, &new_scene(uuid, movie_uuid))
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE scenes SET version = version + 1 WHERE uuid = $1")
        .bind(uuid)
        .execute(&mut *tx)
        .await
        .unwrap();

    let update = tokio::spawn({
        let pool = pool.clone();
        async move {
            let input = UpdateSceneLocalizations {
                version: None,
                localizations: vec![SceneLocalizationInput {
                    locale: "de".to_string(),
                    title: "Fort Sedgwick (de)".to_string(),
                    description: None,
                }],
            };
            SceneRepo::update_localizations(&pool, uuid, &input, UpdateMode::Override).await
        }
    });
    wait_until_blocked(&pool).await;
    tx.commit().await.unwrap();

    assert_matches!(
        update.await.unwrap(),
        Err(StoreError::Core(CoreError::VersionConflict { entity: "Scene", expected: 0, .. }))
    );

    let record = SceneRepo::get(&pool, uuid).await.unwrap();
    assert_eq!(record.scene.version, 1);
    assert!(record.localizations.contains(&Locale::parse("en").unwrap()));
}
