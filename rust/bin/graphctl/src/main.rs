//! `graphctl` — inspect and edit an object graph stored in a redb file.
//!
//! Usage:
//!   graphctl --schema types.yaml --db graph.redb export 3
//!   graphctl --data-dir ./data import -f edited.json

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use objgraph_core::GraphConfig;

/// Object graph CLI.
#[derive(Parser, Debug)]
#[command(name = "graphctl", about = "Object graph CLI")]
struct Cli {
    /// Directory holding graph.redb and types.yaml.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Type-definition file, YAML or JSON (default: {data-dir}/types.yaml).
    #[arg(long = "schema", global = true)]
    schema: Option<PathBuf>,

    /// Database file (default: {data-dir}/graph.redb).
    #[arg(long = "db", global = true)]
    db: Option<PathBuf>,

    /// Maximum relation nesting depth.
    #[arg(long = "max-depth", global = true)]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the type catalog as JSON.
    Catalog,

    /// Save a new record of a type from a JSON fields object.
    Create {
        /// Record type.
        #[arg(value_name = "TYPE")]
        type_name: String,
        /// Fields JSON, e.g. '{"Title": "Home"}'.
        #[arg(long = "json")]
        json_body: String,
    },

    /// Print a record with its relation subtree and the catalog.
    Export {
        /// Record id.
        id: u64,
    },

    /// Save a `{"data": ...}` payload as a new graph.
    Import {
        /// Payload file.
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },

    /// Print a read-only text summary of a record.
    Summary {
        /// Record id.
        id: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = GraphConfig {
        data_dir: cli.data_dir,
        db_path: cli.db,
        schema_path: cli.schema,
        ..Default::default()
    };
    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
    }

    let mut ctx = commands::Context::open(config)?;

    match cli.command {
        Commands::Catalog => commands::catalog(&ctx)?,
        Commands::Create { type_name, json_body } => {
            commands::create(&mut ctx, &type_name, &json_body)?
        }
        Commands::Export { id } => commands::export(&ctx, id)?,
        Commands::Import { file } => commands::import(&mut ctx, &file)?,
        Commands::Summary { id } => commands::summary(&ctx, id)?,
    }

    Ok(())
}
