//! oxide-ingest CLI
//!
//! Loads a JSON array of objects into a SQLite table.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_ingest::input::parse_batch;
use oxide_ingest::prelude::*;
use oxide_ingest::SchemaInspector;

/// Load JSON rows into SQL tables, growing the schema as needed.
#[derive(Parser)]
#[command(name = "oxide-ingest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load rows into a table.
    Load {
        /// Target table.
        #[arg(short, long)]
        table: String,

        /// Identity key column for upserts.
        #[arg(short, long)]
        key: Option<String>,

        /// JSON input file (stdin if not specified).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Fail instead of creating a missing table.
        #[arg(long)]
        no_create: bool,

        /// Fail instead of adding missing columns.
        #[arg(long)]
        no_add_columns: bool,

        /// Plain INSERT even when a key is given.
        #[arg(long)]
        no_upsert: bool,

        /// Schema holding the table.
        #[arg(short, long)]
        schema: Option<String>,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Show the plan and SQL without executing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a table's columns.
    Inspect {
        /// Table to inspect.
        #[arg(short, long)]
        table: String,

        /// Schema holding the table.
        #[arg(short, long)]
        schema: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = SqliteStore::connect(&cli.database).await?;
    let loader = BulkLoader::new(SqliteDialect::new());

    match cli.command {
        Commands::Load {
            table,
            key,
            input,
            no_create,
            no_add_columns,
            no_upsert,
            schema,
            timeout_secs,
            dry_run,
        } => {
            let json = read_input(input.as_ref())?;
            let batch = parse_batch(&json)?;

            let mut options = LoadOptions::new()
                .create_table_if_missing(!no_create)
                .add_missing_columns(!no_add_columns)
                .upsert_on_conflict(!no_upsert);
            if let Some(schema) = schema {
                options = options.schema(schema);
            }
            if let Some(secs) = timeout_secs {
                options = options.timeout(Duration::from_secs(secs));
            }

            if dry_run {
                let preview = loader
                    .preview(&store, &batch, &table, key.as_deref(), &options)
                    .await?;
                if preview.plan.is_noop() {
                    info!(table = %table, "No schema changes needed");
                }
                for statement in &preview.statements {
                    println!("-- {}", statement.intent());
                    println!("{};", statement.sql());
                }
            } else {
                let result = loader
                    .load(&store, &batch, &table, key.as_deref(), &options)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }

        Commands::Inspect { table, schema } => {
            let dialect = loader.dialect();
            let schema = schema.as_deref().unwrap_or_else(|| dialect.default_schema());

            let mut tx = store.begin().await?;
            let shape = SchemaInspector::new(dialect)
                .table_shape(&mut tx, schema, &table)
                .await?;
            store.rollback(tx).await?;

            match shape {
                Some(shape) => {
                    println!("{}:", shape.table());
                    for column in shape.columns() {
                        println!("  {column}");
                    }
                }
                None => println!("Table '{table}' does not exist."),
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read stdin")?;
            Ok(json)
        }
    }
}
