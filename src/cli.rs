use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bourbon_core::StoreConfig;
use bourbon_core::remote::{DEFAULT_COMP_ID, DEFAULT_SOURCE_URL};
use bourbon_core::service::DEFAULT_HTTP_ADDR;
use clap::{Parser, Subcommand};

/// Top-level CLI definition for bourbon.
#[derive(Parser, Debug)]
#[command(name = "bourbon")]
#[command(about = "Look up bourbon bottle prices from the latest published averages", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Disable colored console output.
    #[arg(long, global = true, default_value_t = false)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every bottle, most expensive first.
    All,
    /// Download the latest prices.
    Update,
    /// Compare an asking price against the average for matching bottles.
    #[command(name = "pricecheck")]
    PriceCheck(PriceCheckArgs),
    /// Search bottles by name.
    Search(SearchArgs),
    /// List bottles whose average price falls within a range.
    Budget(BudgetArgs),
    /// Store the JWT used to authorize downloads.
    Auth(AuthArgs),
    /// Serve the JSON API over HTTP.
    Serve(ServeArgs),
}

/// Location of cached data and the remote source, shared by every command.
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory holding the cached CSV and auth.json.
    #[arg(long, global = true, env = "BOURBON_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Endpoint that serves the published price table.
    #[arg(long, global = true, env = "BOURBON_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    /// Component id of the price table on the publishing site.
    #[arg(long, global = true, env = "BOURBON_COMP_ID", default_value = DEFAULT_COMP_ID)]
    pub comp_id: String,

    /// Refresh the cache once it is older than this many hours.
    #[arg(long, global = true, env = "BOURBON_MAX_AGE_HOURS", default_value_t = 24)]
    pub max_age_hours: u64,
}

impl StoreArgs {
    pub fn into_config(self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir,
            source_url: self.source_url,
            comp_id: self.comp_id,
            max_age: Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60)),
        }
    }
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search query; prompted for when omitted.
    #[arg(long, short)]
    pub query: Option<String>,
}

/// Arguments for the `pricecheck` subcommand.
#[derive(clap::Args, Debug)]
pub struct PriceCheckArgs {
    /// Search query; prompted for when omitted.
    #[arg(long, short)]
    pub query: Option<String>,

    /// Price the bottle is being offered at.
    #[arg(long)]
    pub asking_price: Option<f64>,
}

/// Arguments for the `budget` subcommand.
#[derive(clap::Args, Debug)]
pub struct BudgetArgs {
    /// Lowest average price to include.
    #[arg(long)]
    pub lowest_price: Option<f64>,

    /// Highest average price to include.
    #[arg(long)]
    pub highest_price: Option<f64>,

    /// Optional search query (hit enter at the prompt to search all).
    #[arg(long, short)]
    pub query: Option<String>,
}

/// Arguments for the `auth` subcommand.
#[derive(clap::Args, Debug)]
pub struct AuthArgs {
    /// JWT header segment.
    #[arg(long)]
    pub header: Option<String>,

    /// JWT payload segment.
    #[arg(long)]
    pub payload: Option<String>,
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address the HTTP API binds to.
    #[arg(long, default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: SocketAddr,
}
