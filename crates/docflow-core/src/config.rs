//! Configuration module
//!
//! Settings are read from the process environment (optionally seeded from a `.env`
//! file). Unset or unparsable optional values fall back to their defaults; required
//! values produce an error from [`Config::from_env`] or [`Config::validate`].

use std::env;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const INDEXER_MAX_PARALLEL_DOCUMENTS: usize = 5;
const INDEXER_INTERVAL_SECS: u64 = 60;
const INDEXER_QUIET_WINDOW_MINUTES: i64 = 30;
const INDEXER_MAX_BACKOFF_SECS: u64 = 300;

/// Connection and environment settings.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Storage folders the lifecycle moves documents between.
#[derive(Clone, Debug)]
pub struct FolderConfig {
    pub documents_folder_id: String,
    pub drafts_folder_id: String,
    pub shortcuts_folder_id: String,
}

/// Incremental indexer settings.
#[derive(Clone, Debug)]
pub struct IndexerSettings {
    pub max_parallel_documents: usize,
    pub update_document_headers: bool,
    pub update_draft_headers: bool,
    pub use_database_for_document_data: bool,
    pub interval_secs: u64,
    pub quiet_window_minutes: i64,
    pub max_backoff_secs: u64,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            max_parallel_documents: INDEXER_MAX_PARALLEL_DOCUMENTS,
            update_document_headers: false,
            update_draft_headers: false,
            use_database_for_document_data: false,
            interval_secs: INDEXER_INTERVAL_SECS,
            quiet_window_minutes: INDEXER_QUIET_WINDOW_MINUTES,
            max_backoff_secs: INDEXER_MAX_BACKOFF_SECS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DocflowConfig {
    pub base: BaseConfig,
    /// Application URL used in headers and notifications.
    pub base_url: String,
    pub folders: FolderConfig,
    pub indexer: IndexerSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DocflowConfig>);

impl Config {
    fn inner(&self) -> &DocflowConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DocflowConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn base_url(&self) -> &str {
        &self.inner().base_url
    }

    pub fn folders(&self) -> &FolderConfig {
        &self.inner().folders
    }

    pub fn indexer(&self) -> &IndexerSettings {
        &self.inner().indexer
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn required(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).map_err(|_| anyhow::anyhow!("{} must be set", key))
}

impl DocflowConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let base = BaseConfig {
            database_url: required("DATABASE_URL")?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let folders = FolderConfig {
            documents_folder_id: required("DOCUMENTS_FOLDER_ID")?,
            drafts_folder_id: required("DRAFTS_FOLDER_ID")?,
            shortcuts_folder_id: required("SHORTCUTS_FOLDER_ID")?,
        };

        let indexer = IndexerSettings {
            max_parallel_documents: env_or(
                "INDEXER_MAX_PARALLEL_DOCUMENTS",
                INDEXER_MAX_PARALLEL_DOCUMENTS,
            ),
            update_document_headers: env_flag("INDEXER_UPDATE_DOCUMENT_HEADERS"),
            update_draft_headers: env_flag("INDEXER_UPDATE_DRAFT_HEADERS"),
            use_database_for_document_data: env_flag("INDEXER_USE_DATABASE_FOR_DOCUMENT_DATA"),
            interval_secs: env_or("INDEXER_INTERVAL_SECONDS", INDEXER_INTERVAL_SECS),
            quiet_window_minutes: env_or(
                "INDEXER_QUIET_WINDOW_MINUTES",
                INDEXER_QUIET_WINDOW_MINUTES,
            ),
            max_backoff_secs: env_or("INDEXER_MAX_BACKOFF_SECONDS", INDEXER_MAX_BACKOFF_SECS),
        };

        Ok(DocflowConfig {
            base,
            base_url: required("BASE_URL")?,
            folders,
            indexer,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = &self.base.database_url;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("BASE_URL must not be empty"));
        }

        for (name, value) in [
            ("DOCUMENTS_FOLDER_ID", &self.folders.documents_folder_id),
            ("DRAFTS_FOLDER_ID", &self.folders.drafts_folder_id),
            ("SHORTCUTS_FOLDER_ID", &self.folders.shortcuts_folder_id),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("{} must not be empty", name));
            }
        }

        if self.folders.documents_folder_id == self.folders.drafts_folder_id {
            return Err(anyhow::anyhow!(
                "DOCUMENTS_FOLDER_ID and DRAFTS_FOLDER_ID must differ"
            ));
        }

        if self.indexer.max_parallel_documents == 0 {
            return Err(anyhow::anyhow!(
                "INDEXER_MAX_PARALLEL_DOCUMENTS must be greater than 0"
            ));
        }

        if self.indexer.quiet_window_minutes < 0 {
            return Err(anyhow::anyhow!(
                "INDEXER_QUIET_WINDOW_MINUTES must not be negative"
            ));
        }

        Ok(())
    }
}
