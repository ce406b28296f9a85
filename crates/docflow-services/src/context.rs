use docflow_core::{DocumentTypeRegistry, FolderConfig};
use docflow_db::DocumentStore;
use docflow_storage::{DocumentStorage, SearchIndex};
use std::sync::Arc;

/// Shared handles the lifecycle services are built from.
#[derive(Clone)]
pub struct LifecycleContext {
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn DocumentStorage>,
    pub search: Arc<dyn SearchIndex>,
    pub registry: DocumentTypeRegistry,
    /// Application URL, used for document links in headers and notifications
    pub base_url: String,
    pub folders: FolderConfig,
}

impl LifecycleContext {
    /// Link to a document in the application.
    pub fn document_url(&self, file_id: &str, is_draft: bool) -> String {
        document_url(&self.base_url, file_id, is_draft)
    }
}

pub(crate) fn document_url(base_url: &str, file_id: &str, is_draft: bool) -> String {
    let mut url = format!("{}/document/{}", base_url.trim_end_matches('/'), file_id);
    if is_draft {
        url.push_str("?draft=true");
    }
    url
}
