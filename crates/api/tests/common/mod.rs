#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use cinemap_api::config::ServerConfig;
use cinemap_api::metadata::CatalogMetadataSource;
use cinemap_api::router::build_app_router;
use cinemap_api::state::AppState;
use cinemap_core::locale::Locale;
use cinemap_core::metadata::{LocalizedMetadata, MovieMetadata};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and `en` as default locale.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        default_locale: Locale::parse("en").unwrap(),
        metadata_catalog_path: None,
    }
}

/// Catalog with "Dances with Wolves" (TMDB 581) in English and German.
pub fn test_catalog() -> CatalogMetadataSource {
    let entry = |locale: &str, title: &str| MovieMetadata {
        tmdb_id: 581,
        release_year: Some(1990),
        genres: [(18, "Drama".to_string()), (37, "Western".to_string())]
            .into_iter()
            .collect(),
        imdb_id: Some("tt0099348".to_string()),
        localization: LocalizedMetadata {
            locale: Locale::parse(locale).unwrap(),
            title: title.to_string(),
            overview: None,
            tagline: None,
            poster_url: None,
        },
    };

    CatalogMetadataSource::new()
        .with_movie(entry("en", "Dances with Wolves"))
        .with_movie(entry("de", "Der mit dem Wolf tanzt"))
}

/// Build the full application router with all middleware layers, using the
/// given database pool and the test catalog.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        metadata: Arc::new(test_catalog()),
    };
    build_app_router(state, &config)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    app.oneshot(request).await.unwrap()
}
