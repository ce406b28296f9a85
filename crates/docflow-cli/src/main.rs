//! Docflow CLI: operator commands against the database and search index.
//!
//! Reads the same environment as the services (`DATABASE_URL`, `BASE_URL`, folder ids).

use anyhow::Context;
use clap::{Parser, Subcommand};
use docflow_cli::{format_report, init_tracing, setup_database, watermark_report, CollectionArg};
use docflow_core::{AppError, Collection, Config};
use docflow_db::{DocumentStore, IndexerRepository, PgDocumentStore};
use docflow_services::{CheckOptions, ConsistencyChecker};
use docflow_storage::PgSearchIndex;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docflow", about = "Docflow operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one document's search object with its database record
    Check {
        /// Storage file id of the document
        file_id: String,
        /// Collection to read; defaults to the one matching the document status
        #[arg(long, value_enum)]
        collection: Option<CollectionArg>,
        /// Exit with an error when divergences are found
        #[arg(long)]
        strict: bool,
    },
    /// Check every object of a collection
    Audit {
        #[arg(long, value_enum, default_value = "docs")]
        collection: CollectionArg,
        /// Exit with an error when any object diverges
        #[arg(long)]
        strict: bool,
    },
    /// Show indexer watermarks
    Watermarks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    let pool = setup_database(&config).await?;
    let store = Arc::new(PgDocumentStore::new(pool.clone()));
    let watermarks = IndexerRepository::new(pool.clone());
    let search = Arc::new(PgSearchIndex::new(pool));
    let checker = ConsistencyChecker::new(store.clone(), search);

    match cli.command {
        Commands::Check {
            file_id,
            collection,
            strict,
        } => {
            let collection = match collection {
                Some(arg) => Collection::from(arg),
                None => {
                    let document = store
                        .get_document(&file_id)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("document {} not found", file_id))?;
                    Collection::for_status(document.status)
                }
            };
            let report = checker
                .check(&file_id, collection, CheckOptions::default())
                .await?;
            println!("{}", format_report(&file_id, &report));
            if strict && !report.is_empty() {
                return Err(AppError::Inconsistent(report).into());
            }
        }
        Commands::Audit { collection, strict } => {
            let entries = checker
                .audit(collection.into(), CheckOptions::default())
                .await?;

            let mut diverged = 0;
            let mut failed = 0;
            for entry in &entries {
                match &entry.outcome {
                    Ok(report) => {
                        if !report.is_empty() {
                            diverged += 1;
                        }
                        println!("{}", format_report(&entry.object_id, report));
                    }
                    Err(e) => {
                        failed += 1;
                        println!("{}: error: {}", entry.object_id, e);
                    }
                }
            }
            println!(
                "checked {} object(s): {} diverged, {} failed",
                entries.len(),
                diverged,
                failed
            );
            if strict && (diverged > 0 || failed > 0) {
                anyhow::bail!("audit found {} inconsistent object(s)", diverged + failed);
            }
        }
        Commands::Watermarks => {
            println!("{}", watermark_report(&watermarks).await?);
        }
    }

    Ok(())
}
