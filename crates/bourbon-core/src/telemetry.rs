use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry_prometheus::PrometheusExporter;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING: OnceLock<()> = OnceLock::new();
static TELEMETRY: OnceCell<TelemetryState> = OnceCell::new();
static METRICS: OnceCell<MetricsHandles> = OnceCell::new();

struct TelemetryState {
    _provider: SdkMeterProvider,
    registry: Registry,
}

struct MetricsHandles {
    queries: Counter<u64>,
    query_results: Histogram<f64>,
    refreshes: Counter<u64>,
}

/// Install human-readable logging on stderr for one-shot CLI commands.
/// Defaults to `warn` so table output is not interleaved with chatter.
pub fn init_cli() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Initialize JSON logging and metrics exporters for the HTTP service. Safe
/// to call multiple times.
pub fn init_server() -> Result<()> {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
    configure_metrics()?;
    Ok(())
}

fn configure_metrics() -> Result<&'static TelemetryState> {
    TELEMETRY.get_or_try_init(|| {
        let registry = Registry::new();
        let exporter = build_exporter(&registry)?;

        let provider = SdkMeterProvider::builder()
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                "bourbon",
            )]))
            .with_reader(exporter)
            .build();

        global::set_meter_provider(provider.clone());

        let meter = global::meter("bourbon");
        let queries = meter
            .u64_counter("bourbon_queries_total")
            .with_description("Number of dataset queries served")
            .init();
        let query_results = meter
            .f64_histogram("bourbon_query_results")
            .with_description("Number of bottles returned per query")
            .init();
        let refreshes = meter
            .u64_counter("bourbon_refreshes_total")
            .with_description("Dataset refresh attempts by outcome")
            .init();

        METRICS
            .set(MetricsHandles {
                queries,
                query_results,
                refreshes,
            })
            .map_err(|_| anyhow!("metrics handles already initialized"))?;

        Ok(TelemetryState {
            _provider: provider,
            registry,
        })
    })
}

fn build_exporter(registry: &Registry) -> Result<PrometheusExporter> {
    opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build Prometheus exporter")
}

fn metrics() -> Option<&'static MetricsHandles> {
    METRICS.get()
}

/// Record one query and the size of its result set.
pub fn record_query(operation: &'static str, results: usize) {
    if let Some(metrics) = metrics() {
        let labels = [KeyValue::new("operation", operation)];
        metrics.queries.add(1, &labels);
        metrics.query_results.record(results as f64, &labels);
    }
}

/// Record a dataset refresh attempt (`ok` or `error`).
pub fn record_refresh(outcome: &'static str) {
    if let Some(metrics) = metrics() {
        metrics
            .refreshes
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

/// Render all currently collected metrics in Prometheus text format.
pub fn export_prometheus() -> Result<String> {
    let state = TELEMETRY
        .get()
        .ok_or_else(|| anyhow!("telemetry not initialized"))?;
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics buffer is not valid UTF-8")
}
