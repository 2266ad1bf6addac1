use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bourbon_core::{Credentials, DataStore, FetchError, StoreConfig};
use tempfile::tempdir;

const REMOTE_CSV: &str = "Bottle,Average\nStagg,90\nBlanton's,95\n";

#[derive(Clone)]
struct FakeRemote {
    status: StatusCode,
    csv: &'static str,
    hits: Arc<AtomicUsize>,
}

/// Stand-in for the publishing site: accepts exactly one credential pair.
async fn serve_file(
    State(remote): State<FakeRemote>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    remote.hits.fetch_add(1, Ordering::SeqCst);
    if params.get("instance").map(String::as_str) != Some("good-header.good-payload") {
        return (StatusCode::UNAUTHORIZED, "token expired").into_response();
    }
    if params.get("compId").map(String::as_str) != Some("comp-test")
        || params.get("isSite").map(String::as_str) != Some("False")
    {
        return (StatusCode::BAD_REQUEST, "bad component").into_response();
    }
    if remote.status != StatusCode::OK {
        return (remote.status, "upstream exploded").into_response();
    }
    Json(serde_json::json!({ "csvData": remote.csv })).into_response()
}

async fn spawn_remote(status: StatusCode, csv: &'static str) -> String {
    spawn_counting_remote(status, csv, Arc::default()).await
}

async fn spawn_counting_remote(
    status: StatusCode,
    csv: &'static str,
    hits: Arc<AtomicUsize>,
) -> String {
    let app = Router::new()
        .route("/api/file", get(serve_file))
        .with_state(FakeRemote { status, csv, hits });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake remote");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/file")
}

fn store_for(dir: &Path, source_url: String, header: &str) -> DataStore {
    store_with_max_age(dir, source_url, header, Duration::from_secs(24 * 60 * 60))
}

fn store_with_max_age(
    dir: &Path,
    source_url: String,
    header: &str,
    max_age: Duration,
) -> DataStore {
    let config = StoreConfig {
        data_dir: dir.to_path_buf(),
        source_url,
        comp_id: "comp-test".to_string(),
        max_age,
    };
    Credentials {
        header: header.to_string(),
        payload: "good-payload".to_string(),
    }
    .save(&config.auth_path())
    .expect("failed to write credentials");
    DataStore::new(config)
}

#[tokio::test]
async fn update_replaces_cache_with_remote_data() {
    let dir = tempdir().expect("failed to create tempdir");
    let url = spawn_remote(StatusCode::OK, REMOTE_CSV).await;
    let store = store_for(dir.path(), url, "good-header");

    let report = store.update().await.expect("update should succeed");
    assert_eq!(report.rows, 2);
    assert_eq!(report.path, store.config().dataset_path());

    let cached = std::fs::read_to_string(store.config().dataset_path()).expect("cache written");
    assert_eq!(cached, REMOTE_CSV);
    assert!(!dir.path().join("bourbon.csv.tmp").exists());
}

#[tokio::test]
async fn load_downloads_missing_cache() {
    let dir = tempdir().expect("failed to create tempdir");
    let url = spawn_remote(StatusCode::OK, REMOTE_CSV).await;
    let store = store_for(dir.path(), url, "good-header");

    let dataset = store.load().await.expect("load should download");
    let all = dataset.all();
    let names: Vec<&str> = all.iter().map(|r| r.bottle.as_str()).collect();
    assert_eq!(names, vec!["Blanton's", "Stagg"]);
    assert!(store.config().dataset_path().exists());
}

#[tokio::test]
async fn invalid_credentials_leave_cache_untouched() {
    let dir = tempdir().expect("failed to create tempdir");
    let url = spawn_remote(StatusCode::OK, REMOTE_CSV).await;
    let store = store_for(dir.path(), url, "stale-header");

    let previous = "Bottle,Average\nOld Fitzgerald,100\n";
    std::fs::write(store.config().dataset_path(), previous).expect("seed cache");

    let err = store.update().await.expect_err("update should fail");
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::Unauthorized(body)) => assert_eq!(body, "token expired"),
        other => panic!("expected unauthorized, got {other:?}"),
    }
    assert!(err.to_string().contains("expired or invalid"));

    let cached = std::fs::read_to_string(store.config().dataset_path()).expect("cache kept");
    assert_eq!(cached, previous);
}

#[tokio::test]
async fn non_success_status_surfaces_status_and_body() {
    let dir = tempdir().expect("failed to create tempdir");
    let url = spawn_remote(StatusCode::INTERNAL_SERVER_ERROR, REMOTE_CSV).await;
    let store = store_for(dir.path(), url, "good-header");

    let err = store.update().await.expect_err("update should fail");
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::Status { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!store.config().dataset_path().exists());
}

#[tokio::test]
async fn unusable_payload_is_not_cached() {
    let dir = tempdir().expect("failed to create tempdir");
    let url = spawn_remote(StatusCode::OK, "Name,Price\nStagg,90\n").await;
    let store = store_for(dir.path(), url, "good-header");

    let err = store.update().await.expect_err("update should fail");
    assert!(format!("{err:#}").contains("Bottle"));
    assert!(!store.config().dataset_path().exists());
}

#[tokio::test]
async fn load_refreshes_stale_cache() {
    let dir = tempdir().expect("failed to create tempdir");
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_counting_remote(StatusCode::OK, REMOTE_CSV, hits.clone()).await;
    let store = store_with_max_age(dir.path(), url, "good-header", Duration::ZERO);
    std::fs::write(
        store.config().dataset_path(),
        "Bottle,Average\nOld Fitzgerald,100\n",
    )
    .expect("seed cache");

    let dataset = store.load().await.expect("stale cache should refresh");
    let all = dataset.all();
    let names: Vec<&str> = all.iter().map(|r| r.bottle.as_str()).collect();
    assert_eq!(names, vec!["Blanton's", "Stagg"]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let cached = std::fs::read_to_string(store.config().dataset_path()).expect("cache written");
    assert_eq!(cached, REMOTE_CSV);
}

#[tokio::test]
async fn reading_after_update_does_not_download_again() {
    let dir = tempdir().expect("failed to create tempdir");
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_counting_remote(StatusCode::OK, REMOTE_CSV, hits.clone()).await;
    let store = store_with_max_age(dir.path(), url, "good-header", Duration::ZERO);

    store.update().await.expect("update should succeed");
    let dataset = store.read_cached().await.expect("cache readable");
    assert_eq!(dataset.records().len(), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
