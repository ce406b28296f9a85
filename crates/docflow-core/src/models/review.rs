use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "review_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    ChangesRequested,
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReviewStatus::Approved => write!(f, "approved"),
            ReviewStatus::ChangesRequested => write!(f, "changes_requested"),
        }
    }
}

/// A reviewer's latest verdict on a document. At most one row exists per
/// (document, reviewer); a new verdict overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentReview {
    pub document_id: Uuid,
    pub user_email: String,
    pub status: ReviewStatus,
    pub updated_at: DateTime<Utc>,
}

/// Emails of reviewers with the given status.
pub fn reviewers_with_status(reviews: &[DocumentReview], status: ReviewStatus) -> Vec<String> {
    reviews
        .iter()
        .filter(|r| r.status == status)
        .map(|r| r.user_email.clone())
        .collect()
}
