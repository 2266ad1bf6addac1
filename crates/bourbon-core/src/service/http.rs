use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Response, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::dataset::{BottleRecord, Dataset, PriceCheck};
use crate::remote::FetchError;
use crate::store::DataStore;
use crate::telemetry;

type SharedStore = Arc<DataStore>;
type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search_query: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceCheckParams {
    pub search_query: String,
    pub asking_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct BudgetParams {
    pub lower_bound: f64,
    pub upper_bound: f64,
    #[serde(default)]
    pub search_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

/// Build the API router over a shared data store.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/search", get(search))
        .route("/pricecheck", get(price_check))
        .route("/budget", get(budget))
        .with_state(store)
}

/// Start the HTTP server and run until shutdown.
pub async fn serve(addr: SocketAddr, store: SharedStore) -> Result<()> {
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP address {addr}"))?;
    tracing::info!(%addr, "bourbon API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| format!("failed to run HTTP server on {addr}"))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello World",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn search(
    State(store): State<SharedStore>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BottleRecord>>, ApiError> {
    let dataset = load_dataset(&store).await?;
    let results = dataset.search(&params.search_query);
    telemetry::record_query("search", results.len());
    Ok(Json(results))
}

async fn price_check(
    State(store): State<SharedStore>,
    Query(params): Query<PriceCheckParams>,
) -> Result<Json<Vec<PriceCheck>>, ApiError> {
    let dataset = load_dataset(&store).await?;
    let results = dataset
        .price_check(&params.search_query, params.asking_price)
        .map_err(|err| error_response(StatusCode::BAD_REQUEST, err.to_string()))?;
    telemetry::record_query("pricecheck", results.len());
    Ok(Json(results))
}

async fn budget(
    State(store): State<SharedStore>,
    Query(params): Query<BudgetParams>,
) -> Result<Json<Vec<BottleRecord>>, ApiError> {
    let dataset = load_dataset(&store).await?;
    let results = dataset.budget(
        params.lower_bound,
        params.upper_bound,
        params.search_query.as_deref(),
    );
    telemetry::record_query("budget", results.len());
    Ok(Json(results))
}

async fn metrics() -> Result<Response<Body>, StatusCode> {
    match telemetry::export_prometheus() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(body))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        Err(err) => {
            tracing::error!(error = %err, "failed to export metrics");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_dataset(store: &DataStore) -> Result<Dataset, ApiError> {
    store.load().await.map_err(|err| {
        let message = format!("{err:#}");
        tracing::error!(error = %message, "failed to load dataset");
        let status = match err.downcast_ref::<FetchError>() {
            Some(
                FetchError::MissingCredentials(_)
                | FetchError::ReadCredentials { .. }
                | FetchError::ParseCredentials { .. },
            ) => StatusCode::SERVICE_UNAVAILABLE,
            Some(_) => StatusCode::BAD_GATEWAY,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, message)
    })
}

fn error_response(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { message }))
}
