mod cli;
mod console;
mod progress;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use bourbon_core::service::{self, ServeConfig};
use bourbon_core::{
    CacheState, Credentials, DataStore, Dataset, StoreConfig, UpdateReport, telemetry,
};
use clap::Parser;

use crate::cli::{AuthArgs, BudgetArgs, Cli, Commands, PriceCheckArgs, SearchArgs};
use crate::console::Console;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if !matches!(cli.command, Commands::Serve(_)) {
        telemetry::init_cli();
    }
    let config = cli.store.into_config();
    let color = !cli.no_color;
    let mut console = Console::stdout(color);
    let mut input = io::stdin().lock();

    match cli.command {
        Commands::Auth(args) => auth(&mut console, &mut input, &config, args),
        Commands::Update => {
            let store = DataStore::new(config);
            let report = fetch_latest(&store, color).await?;
            console.success(&update_message(&report))
        }
        Commands::All => {
            let dataset = prepare(&mut console, &DataStore::new(config), color).await?;
            console.print_records("All Bourbon", &dataset.all())
        }
        Commands::Search(SearchArgs { query }) => {
            let query = text_or_prompt(&mut console, &mut input, query, "Search query")?;
            let dataset = prepare(&mut console, &DataStore::new(config), color).await?;
            console.print_records("Search Results", &dataset.search(&query))
        }
        Commands::PriceCheck(PriceCheckArgs {
            query,
            asking_price,
        }) => {
            let query = text_or_prompt(&mut console, &mut input, query, "Search query")?;
            let asking_price =
                price_or_prompt(&mut console, &mut input, asking_price, "Asking price")?;
            let dataset = prepare(&mut console, &DataStore::new(config), color).await?;
            let checks = dataset.price_check(&query, asking_price)?;
            console.print_price_checks("Price Check Results", &checks)
        }
        Commands::Budget(BudgetArgs {
            lowest_price,
            highest_price,
            query,
        }) => {
            let low = price_or_prompt(&mut console, &mut input, lowest_price, "Low price")?;
            let high = price_or_prompt(&mut console, &mut input, highest_price, "High price")?;
            let query = text_or_prompt(
                &mut console,
                &mut input,
                query,
                "Optional search query (hit enter to search all)",
            )?;
            let dataset = prepare(&mut console, &DataStore::new(config), color).await?;
            let query = Some(query.as_str()).filter(|q| !q.is_empty());
            console.print_records("Budget Results", &dataset.budget(low, high, query))
        }
        Commands::Serve(args) => {
            service::serve(ServeConfig {
                http_addr: args.http_addr,
                store: config,
            })
            .await
        }
    }
}

/// Refresh a missing or stale cache with a console notice, then load it.
async fn prepare<W: Write>(
    console: &mut Console<W>,
    store: &DataStore,
    color: bool,
) -> Result<Dataset> {
    match store.cache_state().await? {
        CacheState::Fresh => {}
        CacheState::Missing => {
            console.info("CSV file not found. Downloading latest data...")?;
            let report = fetch_latest(store, color).await?;
            console.success(&update_message(&report))?;
        }
        CacheState::Stale(_) => {
            let hours = store.config().max_age.as_secs() / 3600;
            console.warn(&format!(
                "Warning: CSV file is more than {hours} hours old. Running `bourbon update` to update to the latest data..."
            ))?;
            let report = fetch_latest(store, color).await?;
            console.success(&update_message(&report))?;
        }
    }
    let dataset = store.read_cached().await?;
    tracing::debug!(rows = dataset.records().len(), "dataset loaded");
    Ok(dataset)
}

/// Download the latest data behind a spinner.
async fn fetch_latest(store: &DataStore, color: bool) -> Result<UpdateReport> {
    let spinner = progress::create_spinner("Getting latest prices...", color);
    let report = store.update().await;
    spinner.finish_and_clear();
    report
}

fn auth<W: Write, R: BufRead>(
    console: &mut Console<W>,
    input: &mut R,
    config: &StoreConfig,
    args: AuthArgs,
) -> Result<()> {
    let credentials = Credentials {
        header: text_or_prompt(console, input, args.header, "JWT header")?,
        payload: text_or_prompt(console, input, args.payload, "JWT payload")?,
    };
    let path = config.auth_path();
    credentials.save(&path)?;
    console.success(&format!("Saved credentials to {}", path.display()))
}

fn update_message(report: &UpdateReport) -> String {
    format!(
        "Bourbon bottles and prices updated successfully to the latest data as of {}",
        report.updated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

fn text_or_prompt<W: Write, R: BufRead>(
    console: &mut Console<W>,
    input: &mut R,
    value: Option<String>,
    label: &str,
) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => console.prompt(input, label),
    }
}

fn price_or_prompt<W: Write, R: BufRead>(
    console: &mut Console<W>,
    input: &mut R,
    value: Option<f64>,
    label: &str,
) -> Result<f64> {
    match value {
        Some(value) => Ok(value),
        None => console.prompt_price(input, label),
    }
}
