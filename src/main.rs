mod error;
mod fetcher;
mod locator;
mod reindex;
mod row;
mod settings;
mod token;
mod workbook;

#[cfg(test)]
mod testutil;

use clap::{Parser, Subcommand};
use tracing::info;

use fetcher::{PageSource, ResourceFetcher};
use reindex::{admit, Outcome};
use row::ResourcePath;
use token::TokenProvider;
use workbook::WorkbookClient;

#[derive(Parser)]
#[command(name = "preview_index", about = "Re-index a published merch card into the preview index sheet")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update or insert the index row for one published resource
    Reindex {
        /// Site-relative resource path, e.g. /cc-shared/fragments/merch/.../merch-card/x.md
        #[arg(short, long, env = "RESOURCE_PATH")]
        path: Option<String>,
    },
    /// Fetch and print the index row for a resource without touching the sheet
    Preview {
        #[arg(short, long, env = "RESOURCE_PATH")]
        path: Option<String>,
    },
    /// Check that every required setting is present
    Check,
}

/// The npm trigger passes the path as `npm_config_path`.
fn resolve_path(arg: Option<String>) -> ResourcePath {
    let path = arg
        .or_else(|| std::env::var("npm_config_path").ok())
        .unwrap_or_default();
    ResourcePath::new(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let raw = settings::load()?;

    match cli.command {
        Commands::Check => {
            if raw.validate().is_ok() {
                println!("Config is valid.");
            } else {
                println!("Config is invalid.");
            }
        }
        Commands::Preview { path } => {
            let path = resolve_path(path);
            let settings = match admit(&raw, &path) {
                Ok(settings) => settings,
                Err(reason) => {
                    println!("{}", Outcome::Skipped(reason));
                    return Ok(());
                }
            };
            let fetcher = ResourceFetcher::new(reqwest::Client::new(), &settings);
            match fetcher.fetch(path.index_key()).await? {
                Some(row) => println!("{}", serde_json::to_string_pretty(&row.values())?),
                None => println!("No merch card found for {}", path.index_key()),
            }
        }
        Commands::Reindex { path } => {
            let path = resolve_path(path);
            let settings = match admit(&raw, &path) {
                Ok(settings) => settings,
                Err(reason) => {
                    println!("{}", Outcome::Skipped(reason));
                    return Ok(());
                }
            };

            info!(consumer = %settings.consumer, index = %settings.index_file, "Reindexing {}", path.as_str());
            let http = reqwest::Client::new();
            let fetcher = ResourceFetcher::new(http.clone(), &settings);
            let tokens = TokenProvider::new(http.clone(), &settings);
            let sheet = WorkbookClient::new(http, tokens, &settings);

            let outcome = reindex::reindex(&fetcher, &sheet, &settings.index_file, &path).await;
            println!("{}", outcome);
        }
    }

    Ok(())
}
