use anyhow::{Context, Result};
use docflow_core::{Collection, Config, ConsistencyReport};
use docflow_db::WatermarkStore;
use docflow_infra::TelemetryConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;

/// Search collection selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CollectionArg {
    Drafts,
    Docs,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Drafts => Collection::Drafts,
            CollectionArg::Docs => Collection::Docs,
        }
    }
}

/// Initialize tracing for the CLI. Honors `RUST_LOG` and `LOG_FORMAT`.
pub fn init_tracing() -> Result<()> {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    docflow_infra::init_telemetry(&TelemetryConfig::from_env("docflow-cli", environment))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

/// Connect to Postgres and apply pending migrations.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .connect(config.database_url())
        .await
        .context("Failed to connect to database")?;

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::debug!("Database migrations applied");

    Ok(pool)
}

/// One line for a consistent object, or a heading followed by one indented line per divergence.
pub fn format_report(object_id: &str, report: &ConsistencyReport) -> String {
    if report.is_empty() {
        return format!("{}: ok", object_id);
    }
    let mut out = format!("{}: {} divergence(s)", object_id, report.len());
    for divergence in report.divergences() {
        out.push_str("\n  ");
        out.push_str(&divergence.to_string());
    }
    out
}

/// Last complete indexer run followed by one `<watermark>  <key>` line per folder.
pub async fn watermark_report(store: &dyn WatermarkStore) -> Result<String> {
    let mut out = match store.last_full_index().await? {
        Some(at) => format!("last full index: {}", at.to_rfc3339()),
        None => "last full index: never".to_string(),
    };
    for folder in store.list_folders().await? {
        out.push_str(&format!(
            "\n{}  {}",
            folder.last_indexed_at.to_rfc3339(),
            folder.google_drive_id
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docflow_core::Divergence;
    use docflow_db::test_helpers::InMemoryDocumentStore;

    #[test]
    fn consistent_objects_render_on_one_line() {
        assert_eq!(format_report("file-1", &ConsistencyReport::new()), "file-1: ok");
    }

    #[test]
    fn divergences_render_one_per_line() {
        let mut report = ConsistencyReport::new();
        report.push(Divergence::not_equal("title", "A", "B"));
        report.push(Divergence::new("status", "bad status"));

        let out = format_report("file-1", &report);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "file-1: 2 divergence(s)");
        assert!(lines[1].contains("title"));
        assert!(lines[2].contains("status"));
    }

    #[tokio::test]
    async fn watermarks_before_first_run() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(
            watermark_report(&store).await.unwrap(),
            "last full index: never"
        );
    }

    #[tokio::test]
    async fn watermarks_list_every_folder() {
        let store = InMemoryDocumentStore::new();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        store.set_last_full_index(at).await.unwrap();
        store.set_folder_watermark("docs-folder", at).await.unwrap();
        store
            .set_folder_watermark("refreshHeaders:drafts-folder", at)
            .await
            .unwrap();

        let out = watermark_report(&store).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "last full index: 2024-06-01T12:00:00+00:00");
        assert!(lines[1..].iter().any(|l| l.ends_with("  docs-folder")));
        assert!(lines[1..]
            .iter()
            .any(|l| l.ends_with("  refreshHeaders:drafts-folder")));
    }

    #[tokio::test]
    async fn watermark_errors_propagate() {
        let store = InMemoryDocumentStore::new();
        store.fail_on("list_folders");
        assert!(watermark_report(&store).await.is_err());
    }

    #[test]
    fn collection_arguments_map_to_collections() {
        assert_eq!(Collection::from(CollectionArg::Drafts), Collection::Drafts);
        assert_eq!(Collection::from(CollectionArg::Docs), Collection::Docs);
    }
}
