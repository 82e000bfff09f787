//! `pricewatch`: terminal front-end for the price-comparison service.
//!
//! Each subcommand is one user action and makes one API call; the outcome
//! goes straight to the view layer.

mod store;
mod view;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pricewatch_core::{
    ApiError, Assistant, AssistantError, ClientConfig, Pager, PriceClient, SearchOptions,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::store::JsonFileStore;

#[derive(Debug, Parser)]
#[command(name = "pricewatch", version, about = "Compare product prices across stores")]
struct Cli {
    /// Service base URL. Overrides PRICEWATCH_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in milliseconds. Overrides PRICEWATCH_TIMEOUT_MS.
    #[arg(long, global = true)]
    timeout_ms: Option<String>,

    /// Where the assistant keeps user id, preferences and history.
    #[arg(long, global = true, default_value = ".pricewatch-state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search every store for a product.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        /// Restrict to a store (repeatable).
        #[arg(long = "store")]
        stores: Vec<String>,
        #[arg(long, default_value = "price", value_parser = ["price", "rating", "name"])]
        sort: String,
        #[arg(long, default_value_t = 0.0)]
        min_rating: f64,
        /// Results fetched for local paging.
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = pricewatch_core::deals::DEFAULT_PAGE_SIZE)]
        page_size: usize,
        /// Pages to show, counting the first.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// List the stores the service scrapes.
    Stores,
    /// Compare one product across stores.
    Compare {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Check that the service is up.
    Health,
    /// Ask the shopping assistant. Reads the query from stdin when omitted.
    Assist { query: Vec<String> },
    /// Have the service watch a product's price.
    Watch {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long)]
        target_price: f64,
    },
    /// Recommendations based on saved history and watchlist.
    Recommend {
        #[arg(long)]
        query: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricewatch=info,pricewatch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    ClientConfig::from_env_with(cli.api_url.as_deref(), cli.timeout_ms.as_deref())
        .context("loading client configuration")
}

fn joined(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

fn failed(action: &str, err: ApiError) -> anyhow::Error {
    anyhow::anyhow!(view::failure_message(action, &err))
}

fn assistant_failed(action: &str, err: AssistantError) -> anyhow::Error {
    match err {
        AssistantError::Api(err) => failed(action, err),
        other => anyhow::Error::new(other).context(format!("{action} failed")),
    }
}

/// The first non-empty line of stdin, standing in for a spoken query.
fn read_query_from_stdin() -> anyhow::Result<String> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading query from stdin")?;
        if !line.trim().is_empty() {
            return Ok(line.trim().to_string());
        }
    }
    bail!("no query given")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = PriceClient::new(client_config(&cli)?);
    debug!(?client, "client ready");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Search {
            query,
            stores,
            sort,
            min_rating,
            limit,
            page_size,
            pages,
        } => {
            let query = joined(&query);
            if query.is_empty() {
                bail!("Please enter a product name to search");
            }
            let options = SearchOptions {
                stores,
                sort,
                min_rating,
                limit,
            };
            let results = client
                .search_products(&query, &options)
                .await
                .map_err(|e| failed("Search", e))?;

            let mut pager = Pager::new(page_size);
            for _ in 1..pages.max(1) {
                pager.load_more();
            }
            view::render_search(&mut out, &query, &results, &pager)?;
        }
        Command::Stores => {
            let stores = client.get_stores().await.map_err(|e| failed("Store lookup", e))?;
            view::render_stores(&mut out, &stores)?;
        }
        Command::Compare { query } => {
            let comparison = client
                .compare_products(&joined(&query))
                .await
                .map_err(|e| failed("Comparison", e))?;
            view::render_comparison(&mut out, &comparison)?;
        }
        Command::Health => {
            let health = client
                .get_health()
                .await
                .map_err(|e| failed("Health check", e))?;
            view::render_health(&mut out, &health)?;
        }
        Command::Assist { query } => {
            let query = match joined(&query) {
                q if q.is_empty() => read_query_from_stdin()?,
                q => q,
            };
            let mut assistant = Assistant::new(client, JsonFileStore::open(&cli.state)?);
            let insights = assistant
                .intelligent_search(&query)
                .await
                .map_err(|e| assistant_failed("Intelligent search", e))?;
            view::render_insights(&mut out, &insights)?;
        }
        Command::Watch {
            query,
            target_price,
        } => {
            let mut assistant = Assistant::new(client, JsonFileStore::open(&cli.state)?);
            let receipt = assistant
                .add_to_watchlist(&joined(&query), target_price)
                .await
                .map_err(|e| assistant_failed("Watchlist", e))?;
            view::render_watchlist(&mut out, &receipt)?;
        }
        Command::Recommend { query } => {
            let mut assistant = Assistant::new(client, JsonFileStore::open(&cli.state)?);
            assistant.set_current_query(query);
            let recs = assistant
                .smart_recommendations()
                .await
                .map_err(|e| assistant_failed("Smart recommendations", e))?;
            view::render_recommendations(&mut out, &recs)?;
        }
    }

    out.flush()?;
    Ok(())
}
