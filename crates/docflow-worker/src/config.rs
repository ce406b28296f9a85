use docflow_core::{FolderConfig, IndexerSettings};
use std::time::Duration;

/// Indexer loop configuration
#[derive(Clone, Debug)]
pub struct IndexerConfig {
    pub documents_folder_id: String,
    pub drafts_folder_id: String,
    /// Upper bound on concurrent header rewrites
    pub max_parallel_documents: usize,
    pub update_document_headers: bool,
    pub update_draft_headers: bool,
    /// Build indexed objects from the database instead of the existing projection
    pub use_database_for_document_data: bool,
    /// Sleep between successful iterations
    pub interval: Duration,
    /// Documents modified more recently than this are left alone by header refresh
    pub quiet_window: chrono::Duration,
    pub max_backoff: Duration,
}

impl IndexerConfig {
    pub fn new(settings: &IndexerSettings, folders: &FolderConfig) -> Self {
        Self {
            documents_folder_id: folders.documents_folder_id.clone(),
            drafts_folder_id: folders.drafts_folder_id.clone(),
            max_parallel_documents: settings.max_parallel_documents.max(1),
            update_document_headers: settings.update_document_headers,
            update_draft_headers: settings.update_draft_headers,
            use_database_for_document_data: settings.use_database_for_document_data,
            interval: Duration::from_secs(settings.interval_secs),
            quiet_window: chrono::Duration::minutes(settings.quiet_window_minutes),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
        }
    }

    /// Delay before the next iteration after `failures` consecutive failed runs.
    pub fn backoff(&self, failures: u32) -> Duration {
        self.interval
            .saturating_mul(2_u32.saturating_pow(failures))
            .min(self.max_backoff)
    }
}
