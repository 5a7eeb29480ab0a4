//! HTTP-level integration tests for the `/scenes` endpoints and the
//! per-movie scene listing.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_movie(pool: &PgPool) -> Uuid {
    let uuid = Uuid::new_v4();
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/movies",
        json!({
            "uuid": uuid,
            "movie": { "tmdb_id": 581, "release_year": 1990, "imdb_id": null },
            "localization": { "locale": "en", "title": "Dances with Wolves",
                "overview": null, "tagline": null, "poster_url": null }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    uuid
}

fn scene_body(uuid: Uuid, movie_uuid: Uuid, locale: &str, title: &str) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "scene": { "movie_uuid": movie_uuid, "latitude": 44.08, "longitude": -103.23 },
        "localization": { "locale": locale, "title": title, "description": null }
    })
}

async fn create_scene(pool: &PgPool, movie_uuid: Uuid, title: &str) -> Uuid {
    let uuid = Uuid::new_v4();
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/scenes",
        scene_body(uuid, movie_uuid, "en", title),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    uuid
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_scene_returns_201(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;
    let uuid = Uuid::new_v4();

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/scenes",
        scene_body(uuid, movie_uuid, "en", "Fort Sedgwick"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["uuid"], uuid.to_string());
    assert_eq!(json["data"]["movie_uuid"], movie_uuid.to_string());
    assert_eq!(json["data"]["title"], "Fort Sedgwick");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_scene_for_unknown_movie_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/scenes",
        scene_body(Uuid::new_v4(), Uuid::new_v4(), "en", "Nowhere"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_scene_with_out_of_range_latitude_returns_400(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/scenes",
        json!({
            "uuid": Uuid::new_v4(),
            "scene": { "movie_uuid": movie_uuid, "latitude": 91.0, "longitude": 0.0 },
            "localization": { "locale": "en", "title": "Off the map", "description": null }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_movie_scenes_lists_only_that_movie(pool: PgPool) {
    let wolves = create_movie(&pool).await;
    let other = create_movie(&pool).await;
    create_scene(&pool, wolves, "Fort Sedgwick").await;
    create_scene(&pool, wolves, "Buffalo Hunt").await;
    create_scene(&pool, other, "Elsewhere").await;

    let app = common::build_test_app(pool.clone());
    let json = body_json(get(app, &format!("/api/v1/movies/{wolves}/scenes?locale=de")).await).await;
    let scenes = json["data"].as_array().unwrap();
    assert_eq!(scenes.len(), 2);
    assert!(scenes.iter().all(|s| s["locale"] == "en"));

    let app = common::build_test_app(pool);
    let json = body_json(get(app, "/api/v1/scenes").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_scene_localizations_merge_and_read(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;
    let uuid = create_scene(&pool, movie_uuid, "Fort Sedgwick").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/scenes/{uuid}/localizations?override=false"),
        json!({
            "version": 0,
            "localizations": [{ "locale": "de", "title": "Fort Sedgwick (de)", "description": null }]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let json = body_json(get(app, &format!("/api/v1/scenes/{uuid}?locale=de")).await).await;
    assert_eq!(json["data"]["title"], "Fort Sedgwick (de)");
    assert_eq!(json["data"]["version"], 1);

    let app = common::build_test_app(pool);
    let json = body_json(get(app, &format!("/api/v1/scenes/{uuid}/localizations")).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_scene_moves_coordinates(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;
    let uuid = create_scene(&pool, movie_uuid, "Fort Sedgwick").await;

    let app = common::build_test_app(pool);
    let response = put_json(
        app,
        &format!("/api/v1/scenes/{uuid}"),
        json!({
            "scene": { "movie_uuid": movie_uuid, "latitude": 43.5, "longitude": -103.5 },
            "localization": { "locale": "en", "title": "Fort Sedgwick", "description": "Frontier post" }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["latitude"], 43.5);
    assert_eq!(json["data"]["description"], "Frontier post");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_movie_removes_its_scenes(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;
    let uuid = create_scene(&pool, movie_uuid, "Fort Sedgwick").await;

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/movies/{movie_uuid}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/scenes/{uuid}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_scene_and_delete_all(pool: PgPool) {
    let movie_uuid = create_movie(&pool).await;
    let first = create_scene(&pool, movie_uuid, "Fort Sedgwick").await;
    create_scene(&pool, movie_uuid, "Buffalo Hunt").await;

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/scenes/{first}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = delete(app, "/api/v1/scenes").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["deleted"], 1);
}
