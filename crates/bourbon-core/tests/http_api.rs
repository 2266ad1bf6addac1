use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bourbon_core::service::http::router;
use bourbon_core::{DataStore, StoreConfig};
use serde_json::Value;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

fn fixture_csv() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // bourbon-core
    path.pop(); // crates
    path.join("fixtures/bourbon.csv")
}

/// A store whose cache is a freshly written copy of the fixture, so no
/// request ever needs the network.
fn seeded_store() -> (TempDir, Arc<DataStore>) {
    let dir = tempdir().expect("failed to create tempdir");
    let csv = std::fs::read_to_string(fixture_csv()).expect("failed to read fixture");
    std::fs::write(dir.path().join("bourbon.csv"), csv).expect("failed to seed cache");
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    (dir, Arc::new(DataStore::new(config)))
}

async fn get_json(store: Arc<DataStore>, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    let response = router(store).oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn bottles(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .expect("array response")
        .iter()
        .map(|row| row["Bottle"].as_str().expect("bottle name"))
        .collect()
}

fn averages(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .expect("array response")
        .iter()
        .map(|row| row["Average"].as_f64().expect("numeric average"))
        .collect()
}

#[tokio::test]
async fn root_and_health_respond() {
    let (_dir, store) = seeded_store();
    let (status, body) = get_json(store.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello World");

    let (status, body) = get_json(store, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn search_expands_synonyms_either_way() {
    let (_dir, store) = seeded_store();
    let (status, by_abbreviation) = get_json(store.clone(), "/search?search_query=sib").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bottles(&by_abbreviation),
        vec!["Weller Single Barrel", "Russell's Reserve SiB"]
    );

    let (_, by_phrase) = get_json(store, "/search?search_query=single%20barrel").await;
    assert_eq!(by_phrase, by_abbreviation);
}

#[tokio::test]
async fn search_returns_all_columns() {
    let (_dir, store) = seeded_store();
    let (_, body) = get_json(store, "/search?search_query=buffalo").await;
    assert_eq!(
        body,
        serde_json::json!([
            {"Bottle": "Buffalo Trace", "Average": 20, "Low": 18, "High": 26}
        ])
    );
}

#[tokio::test]
async fn empty_search_returns_everything_sorted() {
    let (_dir, store) = seeded_store();
    let (status, body) = get_json(store, "/search?search_query=").await;
    assert_eq!(status, StatusCode::OK);
    let prices = averages(&body);
    assert_eq!(prices.len(), 13);
    assert!(prices.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn search_requires_query_parameter() {
    let (_dir, store) = seeded_store();
    let (status, _) = get_json(store, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn budget_filters_inclusive_range() {
    let (_dir, store) = seeded_store();
    let (status, body) = get_json(store, "/budget?lower_bound=20&upper_bound=40").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(averages(&body), vec![40.0, 38.0, 35.0, 30.0, 25.0, 20.0]);
}

#[tokio::test]
async fn budget_with_search_query() {
    let (_dir, store) = seeded_store();
    let (_, body) = get_json(
        store,
        "/budget?lower_bound=20&upper_bound=40&search_query=small%20batch",
    )
    .await;
    assert_eq!(
        bottles(&body),
        vec!["Four Roses SmB", "Elijah Craig Small Batch"]
    );
}

#[tokio::test]
async fn price_check_annotates_difference() {
    let (_dir, store) = seeded_store();
    let (status, body) = get_json(
        store,
        "/pricecheck?search_query=weller%20reserve&asking_price=30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array response");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Bottle"], "Weller Special Reserve");
    assert_eq!(rows[0]["Percentage Difference"], 16.67);
    assert_eq!(rows[0]["Price Position"], "above average");
}

#[tokio::test]
async fn price_check_rejects_zero_asking_price() {
    let (_dir, store) = seeded_store();
    let (status, body) =
        get_json(store, "/pricecheck?search_query=weller&asking_price=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .expect("error message")
            .contains("asking price")
    );
}

#[tokio::test]
async fn missing_cache_without_credentials_is_unavailable() {
    let dir = tempdir().expect("failed to create tempdir");
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    let store = Arc::new(DataStore::new(config));
    let (status, body) = get_json(store, "/search?search_query=weller").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(
        body["message"]
            .as_str()
            .expect("error message")
            .contains("auth.json")
    );
}
