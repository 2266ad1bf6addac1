use anyhow::Result;

use crate::telemetry;

pub mod http;
pub mod server;

pub use server::{BourbonServer, DEFAULT_HTTP_ADDR, ServeConfig};

/// Launch the HTTP API with the given configuration.
pub async fn serve(config: ServeConfig) -> Result<()> {
    telemetry::init_server()?;
    BourbonServer::new(config).run().await
}
