//! Document lifecycle transitions
//!
//! `WIP -> In-Review -> Approved`, with `Obsolete` as a terminal value. Reviews
//! move an approver between the approved and changes-requested lists of the
//! projection; the two lists never share a member and only ever contain
//! approvers. A rejected transition leaves the projection untouched.

use docflow_core::models::{DocumentStatus, ReviewStatus};
use docflow_core::{AppError, SearchDocument};

/// A reviewer action on a document in review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    RequestChanges,
}

impl ReviewAction {
    pub fn review_status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::RequestChanges => ReviewStatus::ChangesRequested,
        }
    }

    /// Label of the storage revision pinned for this action.
    pub fn revision_label(&self, actor: &str) -> String {
        match self {
            ReviewAction::Approve => format!("Approved by {}", actor),
            ReviewAction::RequestChanges => format!("Changes requested by {}", actor),
        }
    }

    fn allowed_from(&self, status: DocumentStatus) -> bool {
        match self {
            ReviewAction::Approve => {
                matches!(status, DocumentStatus::InReview | DocumentStatus::Approved)
            }
            ReviewAction::RequestChanges => status == DocumentStatus::InReview,
        }
    }
}

/// Apply a reviewer action to the projection.
pub fn apply_review(
    doc: &mut SearchDocument,
    action: ReviewAction,
    actor: &str,
) -> Result<(), AppError> {
    let status = doc.document_status().ok_or_else(|| {
        AppError::validation(format!("invalid document status {:?}", doc.status))
    })?;
    if !action.allowed_from(status) {
        return Err(AppError::validation(format!(
            "cannot {} a document with status {}",
            match action {
                ReviewAction::Approve => "approve",
                ReviewAction::RequestChanges => "request changes on",
            },
            status
        )));
    }

    if !doc.approvers.iter().any(|a| a == actor) {
        return Err(AppError::validation(format!(
            "{} is not an approver of this document",
            actor
        )));
    }

    let (target, other) = match action {
        ReviewAction::Approve => (&mut doc.approved_by, &mut doc.changes_requested_by),
        ReviewAction::RequestChanges => (&mut doc.changes_requested_by, &mut doc.approved_by),
    };
    if target.iter().any(|a| a == actor) {
        return Err(AppError::validation(match action {
            ReviewAction::Approve => format!("{} has already approved this document", actor),
            ReviewAction::RequestChanges => {
                format!("{} has already requested changes on this document", actor)
            }
        }));
    }

    target.push(actor.to_string());
    other.retain(|a| a != actor);
    Ok(())
}

pub fn approve(doc: &mut SearchDocument, actor: &str) -> Result<(), AppError> {
    apply_review(doc, ReviewAction::Approve, actor)
}

pub fn request_changes(doc: &mut SearchDocument, actor: &str) -> Result<(), AppError> {
    apply_review(doc, ReviewAction::RequestChanges, actor)
}

/// Move a draft into review with its newly allocated number.
pub fn begin_review(doc: &mut SearchDocument, doc_number: &str) -> Result<(), AppError> {
    match doc.document_status() {
        Some(DocumentStatus::Wip) => {}
        other => {
            return Err(AppError::validation(format!(
                "only WIP documents can be published, status is {}",
                other.map(|s| s.label()).unwrap_or(doc.status.as_str())
            )))
        }
    }
    doc.doc_number = doc_number.to_string();
    doc.set_status(DocumentStatus::InReview);
    Ok(())
}
