//! # ODP Search CLI (`odps`)
//!
//! ```bash
//! odps --config ./config/odps.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `odps rebuild` | Harvest the repository and build a new index generation |
//! | `odps search "<query>"` | Ranked pattern search |
//! | `odps get <id>` | Full record of one pattern |
//! | `odps categories` | Known categories |
//! | `odps list <category>` | Patterns in a category |
//! | `odps serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use odp_search::{commands, config};

/// ODP Search: ranked search over ontology design patterns.
#[derive(Parser)]
#[command(name = "odps", version, about = "Search engine for ontology design patterns")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/odps.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the term and vector indices from the pattern repository.
    Rebuild,

    /// Search patterns.
    Search {
        /// Free-text query or competency question.
        query: String,

        /// Only return patterns in this category.
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results (defaults to `retrieval.final_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the full record of a pattern.
    Get {
        /// Pattern IRI.
        id: String,
    },

    /// List known categories.
    Categories,

    /// List patterns in a category (`Any` lists all).
    List { category: String },

    /// Start the HTTP server on `server.bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("odp_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Rebuild => commands::run_rebuild(cfg).await?,
        Commands::Search {
            query,
            category,
            limit,
        } => commands::run_search(cfg, &query, category, limit).await?,
        Commands::Get { id } => commands::run_get(cfg, &id).await?,
        Commands::Categories => commands::run_categories(cfg).await?,
        Commands::List { category } => commands::run_list(cfg, &category).await?,
        Commands::Serve => commands::run_serve(cfg).await?,
    }

    Ok(())
}
