//! Document lock detection
//!
//! A document is locked while its header table carries unresolved suggestions:
//! rewriting the header would otherwise discard them. The lock flag is persisted
//! so that other components can skip locked documents without reading the body.

use docflow_core::AppError;
use docflow_db::DocumentStore;
use docflow_storage::body::{StructuralElement, Table};
use docflow_storage::{DocBody, DocumentStorage};
use std::sync::Arc;

#[derive(Clone)]
pub struct LockDetector {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn DocumentStorage>,
}

impl LockDetector {
    pub fn new(store: Arc<dyn DocumentStore>, storage: Arc<dyn DocumentStorage>) -> Self {
        Self { store, storage }
    }

    /// Inspect the header of a document and reconcile the persisted lock flag.
    ///
    /// Performs at most one write, and only when the flag changes.
    #[tracing::instrument(skip(self))]
    pub async fn is_locked(&self, google_file_id: &str) -> Result<bool, AppError> {
        let document = self
            .store
            .get_document(google_file_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("document {} not found", google_file_id))
            })?;

        let body = self.storage.get_doc(google_file_id).await?;
        let has_suggestions = contains_suggestion_in_header(&body);

        match (has_suggestions, document.locked) {
            (true, false) => {
                self.store.set_locked(google_file_id, true).await?;
                tracing::info!(google_file_id = %google_file_id, "locked document");
                Ok(true)
            }
            (true, true) => {
                tracing::warn!(
                    google_file_id = %google_file_id,
                    "locked document still contains suggestions in header"
                );
                Ok(true)
            }
            (false, true) => {
                self.store.set_locked(google_file_id, false).await?;
                tracing::info!(google_file_id = %google_file_id, "unlocked document");
                Ok(false)
            }
            (false, false) => {
                tracing::warn!(
                    google_file_id = %google_file_id,
                    "document was already unlocked"
                );
                Ok(false)
            }
        }
    }
}

/// Whether the header table holds any suggested insertion, deletion or style change.
pub fn contains_suggestion_in_header(body: &DocBody) -> bool {
    body.header_table()
        .is_some_and(|(_, table)| table_has_suggestions(table))
}

fn table_has_suggestions(table: &Table) -> bool {
    if !table.suggested_insertion_ids.is_empty() || !table.suggested_deletion_ids.is_empty() {
        return true;
    }
    table.table_rows.iter().any(|row| {
        !row.suggested_insertion_ids.is_empty()
            || !row.suggested_deletion_ids.is_empty()
            || row.table_cells.iter().any(|cell| {
                !cell.suggested_insertion_ids.is_empty()
                    || !cell.suggested_deletion_ids.is_empty()
                    || cell.content.iter().any(element_has_suggestions)
            })
    })
}

fn element_has_suggestions(element: &StructuralElement) -> bool {
    let in_paragraph = element.paragraph.as_ref().is_some_and(|p| {
        p.elements
            .iter()
            .any(|e| e.text_run.as_ref().is_some_and(|run| run.has_suggestions()))
    });
    in_paragraph || element.table.as_ref().is_some_and(table_has_suggestions)
}
