//! shelf-lookup CLI
//!
//! Local entry point for identifier lookups, title search and product page
//! parsing across all catalogs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use shelf_lookup::{
    error::{AppError, Result},
    models::{BookMetadata, Config, SourceId},
    services::LookupAggregator,
    utils::text::{is_valid_identifier, normalize_identifier},
};

/// shelf-lookup - Book Metadata Lookup
#[derive(Parser, Debug)]
#[command(
    name = "shelf-lookup",
    version,
    about = "Book metadata lookup across retail catalogs and open book APIs"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up an ISBN in one source, or in all sources by priority
    Lookup {
        isbn: String,

        /// Source id (kitapyurdu, bkmkitap, idefix, google_books, open_library)
        #[arg(short, long)]
        source: Option<SourceId>,
    },

    /// Search titles across all search-capable sources
    Search {
        query: String,

        /// Restrict the search to a single source
        #[arg(short, long)]
        source: Option<SourceId>,
    },

    /// Parse a product page address from one of the retail sites
    Url { address: String },

    /// List available sources
    Sources,

    /// Validate configuration file
    Validate,
}

#[derive(Serialize)]
struct SourceInfo {
    id: SourceId,
    name: &'static str,
    regional: bool,
    domain: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupOutput {
    source: SourceId,
    #[serde(flatten)]
    book: BookMetadata,
}

/// Initialize logging from the verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    match cli.command {
        Command::Lookup { isbn, source } => {
            if !is_valid_identifier(&isbn) {
                return Err(AppError::validation(format!(
                    "'{isbn}' is not a 10 or 13 digit ISBN"
                )));
            }
            let isbn = normalize_identifier(&isbn);
            let aggregator = LookupAggregator::from_config(&config)?;

            let found = match source {
                Some(source) => aggregator
                    .lookup(&isbn, source)
                    .await?
                    .map(|book| LookupOutput { source, book }),
                None => aggregator
                    .lookup_all_sources(&isbn)
                    .await
                    .map(|(source, book)| LookupOutput { source, book }),
            };

            match found {
                Some(output) => print_json(&output)?,
                None => log::warn!("No metadata found for {}", isbn),
            }
        }

        Command::Search { query, source } => {
            let aggregator = LookupAggregator::from_config(&config)?;
            let results = aggregator.search_by_text(&query, source).await;
            log::info!("{} results for {:?}", results.len(), query);
            print_json(&results)?;
        }

        Command::Url { address } => {
            let aggregator = LookupAggregator::from_config(&config)?;
            match aggregator.lookup_by_address(&address).await {
                Some(book) => print_json(&book)?,
                None => log::warn!("No metadata parsed from {}", address),
            }
        }

        Command::Sources => {
            let sources: Vec<SourceInfo> = SourceId::ALL
                .into_iter()
                .map(|id| SourceInfo {
                    id,
                    name: id.display_name(),
                    regional: id.is_regional(),
                    domain: id.domain(),
                })
                .collect();
            print_json(&sources)?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK ({})", cli.config.display());
        }
    }

    Ok(())
}
