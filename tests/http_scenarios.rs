//! HTTP surface round-trips (§8): the assembled `Repository` + `Exporter` +
//! plugin host driven through `codex_core::http::router` exactly as the
//! server binary wires it, via `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use codex_core::config::CodexConfig;
use codex_core::http::{router, AppState};
use codex_core::jobs::JobEngine;
use codex_core::plugin::{CredentialVault, PluginCatalog, PluginRegistry};
use codex_core::repository::Repository;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let config = CodexConfig::new(dir.path());
    let repo = Repository::new(&config);
    let registry = Arc::new(PluginRegistry::new(Duration::from_secs(config.plugin_dispatch_timeout_secs)));
    let vault = Arc::new(CredentialVault::load(config.credentials_path()).await.unwrap());
    let catalog = Arc::new(
        PluginCatalog::load(config.plugins_catalog_path(), registry.clone(), vault.clone())
            .await
            .unwrap(),
    );
    let jobs = JobEngine::new(config.jobs_dir(), registry.clone(), Duration::from_secs(config.job_timeout_secs));
    let state = Arc::new(AppState {
        repo,
        registry,
        catalog,
        vault,
        jobs,
        config,
    });
    (dir, state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn object_round_trips_through_post_and_get() {
    let (_dir, state) = test_state().await;
    let app = router(state);

    let post_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/codex/object")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("hello-http"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(post_response.status(), StatusCode::CREATED);
    let created = body_json(post_response).await;
    let hash = created["hash"].as_str().unwrap().to_string();

    let get_response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/codex/object?hash={hash}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(
        get_response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    let bytes = axum::body::to_bytes(get_response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello-http");
}

#[tokio::test]
async fn plugin_enable_round_trip_registers_and_removes_via_catalog_put() {
    let (_dir, state) = test_state().await;
    let app = router(state);

    let enable_body = json!({
        "slug": "git",
        "enabled": true,
        "manifest": "{\"repo_url\":\"https://example.invalid/r.git\"}",
    });
    let put_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/plugins-registry")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(enable_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(put_response.status(), StatusCode::OK);

    let list_response = app
        .clone()
        .oneshot(Request::builder().uri("/api/plugins").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let names: Vec<String> = serde_json::from_slice(
        &axum::body::to_bytes(list_response.into_body(), usize::MAX).await.unwrap(),
    )
    .unwrap();
    assert!(names.contains(&"git".to_string()));

    let disable_body = json!({
        "slug": "git",
        "enabled": false,
        "manifest": "{\"repo_url\":\"https://example.invalid/r.git\"}",
    });
    let disable_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/plugins-registry")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(disable_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(disable_response.status(), StatusCode::OK);

    let list_response = app
        .oneshot(Request::builder().uri("/api/plugins").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let names: Vec<String> = serde_json::from_slice(
        &axum::body::to_bytes(list_response.into_body(), usize::MAX).await.unwrap(),
    )
    .unwrap();
    assert!(!names.contains(&"git".to_string()));
}

#[tokio::test]
async fn export_zip_through_http_contains_commit_and_object_entries() {
    let (_dir, state) = test_state().await;
    let hash = state
        .repo
        .objects
        .put_object_stream(std::io::Cursor::new(b"exported-bytes".to_vec()), "application/octet-stream")
        .await
        .unwrap()
        .as_hex();
    let commit = state
        .repo
        .create_commit(vec![], "author", "msg", vec![hash.clone()])
        .await
        .unwrap();

    let app = router(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/codex/export?hash={}&format=zip", commit.hash))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/zip");
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        &format!("attachment; filename=codex-{}.zip", commit.hash)
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    let mut expected = vec![
        "commit.json".to_string(),
        format!("objects/{hash}"),
        format!("objects/{hash}.meta.json"),
    ];
    expected.sort();
    assert_eq!(names, expected);
}
