use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;

use crate::store::{DataStore, StoreConfig};

use super::http;

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Configuration applied when launching the API.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub http_addr: SocketAddr,
    pub store: StoreConfig,
}

/// Top-level service runner.
pub struct BourbonServer {
    config: ServeConfig,
}

impl BourbonServer {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Warm the cache, then serve HTTP until a shutdown signal is received.
    pub async fn run(self) -> Result<()> {
        let store = Arc::new(DataStore::new(self.config.store));
        if let Err(err) = store.ensure_fresh().await {
            tracing::warn!(error = %format!("{err:#}"), "initial dataset refresh failed");
        }
        http::serve(self.config.http_addr, store).await
    }
}
