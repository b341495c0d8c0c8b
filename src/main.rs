mod aggregate;
mod catalog;
mod datastore;
mod query;
mod report;
mod share;
mod types;
mod web;

use catalog::Catalog;
use clap::{Parser, Subcommand};
use env_logger::Env;
use failure::Error;
use log::{error, info, warn};
use share::ShareState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use types::Dataset;
use url::Url;

#[macro_use]
extern crate failure;

#[derive(Parser)]
#[command(name = "how-rare", version, about = "How rare is my car? Road vehicles Australia dashboard")]
struct Cli {
    /// datastore_search_sql endpoint to query
    #[arg(long, env = "HOWRARE_ENDPOINT", default_value = datastore::DEFAULT_ENDPOINT)]
    endpoint: Url,
    /// SQLite file holding the make/model catalog
    #[arg(long, env = "HOWRARE_CATALOG", default_value = "vehicles.db")]
    catalog: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the dashboard and its JSON API
    Serve {
        #[arg(long, env = "HOWRARE_BIND", default_value = "0.0.0.0:8402")]
        bind: SocketAddr,
        /// Maximum number of autocomplete suggestions per search
        #[arg(long, env = "HOWRARE_SEARCH_LIMIT", default_value_t = 50)]
        search_limit: usize,
    },
    /// Print the report for a selection as JSON
    Report {
        /// A share link (e.g. "/?make=TOYOTA&model=HILUX") to start from
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        make: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Minimum model year
        #[arg(long)]
        min: Option<String>,
        /// Maximum model year
        #[arg(long)]
        max: Option<String>,
        #[arg(long)]
        dataset: Option<String>,
    },
    /// List the available datasets
    Datasets,
    /// Load the catalog from a saved datastore_search_sql response
    ImportModels { file: PathBuf },
    /// Rebuild the catalog with a SELECT DISTINCT against the datastore
    RefreshModels {
        #[arg(long, default_value = "2024", value_parser = parse_dataset)]
        dataset: Dataset,
    },
}

fn parse_dataset(s: &str) -> Result<Dataset, String> {
    s.parse().map_err(|e: types::FilterError| e.to_string())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let client = datastore::Client::new(cli.endpoint);
    match cli.command {
        Command::Serve { bind, search_limit } => {
            info!("Starting how-rare");
            let catalog = Catalog::open(&cli.catalog)?;
            if catalog.len()? == 0 {
                warn!(
                    "Catalog {} is empty; run import-models or refresh-models",
                    cli.catalog.display()
                );
            }
            let app = Arc::new(web::App {
                client,
                catalog: Mutex::new(catalog),
                search_limit,
            });
            web::run(app, bind).await;
            info!("Exiting main");
        }
        Command::Report {
            link,
            make,
            model,
            min,
            max,
            dataset,
        } => {
            let mut state = link
                .as_deref()
                .map(ShareState::from_link)
                .unwrap_or_default();
            state.make = make.or(state.make);
            state.model = model.or(state.model);
            state.year_min = min.or(state.year_min);
            state.year_max = max.or(state.year_max);
            state.dataset = dataset.or(state.dataset);
            let report = report::build(&client, &state).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Datasets => {
            for dataset in Dataset::ALL.iter().rev() {
                println!(
                    "{}\t{}\t{}\t{}",
                    dataset,
                    dataset.resource_id().to_hyphenated(),
                    dataset.title(),
                    dataset.source_page()
                );
            }
        }
        Command::ImportModels { file } => {
            let mut catalog = Catalog::open(&cli.catalog)?;
            let count = catalog.import_json(&file)?;
            info!("Imported {} vehicles from {}", count, file.display());
        }
        Command::RefreshModels { dataset } => {
            let mut catalog = Catalog::open(&cli.catalog)?;
            let count = catalog.refresh(&client, dataset).await?;
            info!("Refreshed catalog with {} vehicles from {}", count, dataset);
        }
    }
    Ok(())
}
