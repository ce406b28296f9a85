//! Compensation log of the publication workflow
//!
//! Each forward step that changes an external system pushes the action that
//! undoes it. On failure the log is drained newest first. Every action is
//! attempted even when an earlier one fails, and failures are collected rather
//! than compensated again.

use docflow_core::{AppError, Collection, CompensationFailures, SearchDocument};
use docflow_storage::{DocumentStorage, SearchIndex};

use crate::header::HeaderRenderer;

/// Undo action for one applied publication step.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Rewrite the header from the draft projection (placeholder number, WIP).
    RestoreHeader { draft: SearchDocument },
    /// Let storage garbage-collect the pinned revision again.
    UnpinRevision {
        file_id: String,
        revision_id: String,
    },
    /// Put the draft projection back and drop the published one.
    RestoreDraftObject { original: SearchDocument },
    MoveBackToDrafts { file_id: String },
    DeleteShortcut { shortcut_id: String },
    DeleteRedirect { object_id: String },
}

impl Compensation {
    /// Short name used in logs and in [`CompensationFailures`].
    pub fn step(&self) -> &'static str {
        match self {
            Compensation::RestoreHeader { .. } => "restore header",
            Compensation::UnpinRevision { .. } => "unpin revision",
            Compensation::RestoreDraftObject { .. } => "restore draft search object",
            Compensation::MoveBackToDrafts { .. } => "move file back to drafts",
            Compensation::DeleteShortcut { .. } => "delete shortcut",
            Compensation::DeleteRedirect { .. } => "delete redirect",
        }
    }

    async fn apply(&self, target: &CompensationTarget<'_>) -> Result<(), AppError> {
        match self {
            Compensation::RestoreHeader { draft } => {
                target
                    .headers
                    .replace_header(target.storage, draft, true)
                    .await
            }
            Compensation::UnpinRevision {
                file_id,
                revision_id,
            } => {
                target
                    .storage
                    .keep_revision_forever(file_id, revision_id, false)
                    .await?;
                Ok(())
            }
            Compensation::RestoreDraftObject { original } => {
                target
                    .search
                    .save_object(Collection::Drafts, original)
                    .await?;
                target
                    .search
                    .delete_object(Collection::Docs, &original.object_id)
                    .await?;
                Ok(())
            }
            Compensation::MoveBackToDrafts { file_id } => {
                target
                    .storage
                    .move_file(file_id, target.drafts_folder_id)
                    .await?;
                Ok(())
            }
            Compensation::DeleteShortcut { shortcut_id } => {
                target.storage.delete_file(shortcut_id).await?;
                Ok(())
            }
            Compensation::DeleteRedirect { object_id } => {
                target.search.delete_link(object_id).await?;
                Ok(())
            }
        }
    }
}

/// Handles the compensation actions act on.
pub struct CompensationTarget<'a> {
    pub storage: &'a dyn DocumentStorage,
    pub search: &'a dyn SearchIndex,
    pub headers: &'a HeaderRenderer,
    pub drafts_folder_id: &'a str,
}

/// Ordered log of applied steps.
#[derive(Debug, Default)]
pub struct Compensations {
    actions: Vec<Compensation>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Compensation) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Run every recorded action, newest first.
    pub async fn run(mut self, target: &CompensationTarget<'_>) -> CompensationFailures {
        let mut failures = CompensationFailures::new();
        while let Some(action) = self.actions.pop() {
            let step = action.step();
            match action.apply(target).await {
                Ok(()) => tracing::debug!(step, "compensation applied"),
                Err(e) => {
                    tracing::error!(step, error = %e, "compensation failed");
                    failures.push(step, e);
                }
            }
        }
        failures
    }
}
