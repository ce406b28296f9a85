use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::DOC_NUMBER_PLACEHOLDER;
use crate::models::DocumentFileRevision;

/// Lifecycle status of a document.
///
/// `Wip < InReview < Approved`. `Obsolete` is terminal and has no order
/// relative to the other states, so `partial_cmp` returns `None` for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Wip,
    InReview,
    Approved,
    Obsolete,
}

impl DocumentStatus {
    /// Label used in document headers and the search projection.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Wip => "WIP",
            DocumentStatus::InReview => "In-Review",
            DocumentStatus::Approved => "Approved",
            DocumentStatus::Obsolete => "Obsolete",
        }
    }

    /// Parse a projection label. Accepts the legacy "In Review" spelling.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "wip" => Some(DocumentStatus::Wip),
            "in-review" | "in review" => Some(DocumentStatus::InReview),
            "approved" => Some(DocumentStatus::Approved),
            "obsolete" => Some(DocumentStatus::Obsolete),
            _ => None,
        }
    }

    /// Whether the document lives in the published documents folder.
    pub fn is_published(&self) -> bool {
        !matches!(self, DocumentStatus::Wip)
    }

    fn rank(&self) -> Option<u8> {
        match self {
            DocumentStatus::Wip => Some(0),
            DocumentStatus::InReview => Some(1),
            DocumentStatus::Approved => Some(2),
            DocumentStatus::Obsolete => None,
        }
    }
}

impl PartialOrd for DocumentStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentStatus::from_label(s)
            .ok_or_else(|| anyhow::anyhow!("Invalid document status: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email_address: String,
}

/// Declared type of a document-type custom field.
///
/// Types the application does not understand are preserved in `Other` so that
/// comparisons can fail closed instead of silently skipping them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    String,
    Person,
    People,
    Other(String),
}

impl CustomFieldType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "string" => CustomFieldType::String,
            "person" => CustomFieldType::Person,
            "people" => CustomFieldType::People,
            other => CustomFieldType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CustomFieldType::String => "string",
            CustomFieldType::Person => "person",
            CustomFieldType::People => "people",
            CustomFieldType::Other(s) => s,
        }
    }
}

/// Custom field declared by a document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeCustomField {
    pub id: Uuid,
    pub name: String,
    pub field_type: CustomFieldType,
    pub read_only: bool,
}

impl DocumentTypeCustomField {
    /// Key under which the field is stored in the search projection.
    pub fn key(&self) -> String {
        crate::projection::custom_field_key(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: Uuid,
    pub name: String,
    pub long_name: String,
    pub custom_fields: Vec<DocumentTypeCustomField>,
}

impl DocumentType {
    pub fn custom_field(&self, name: &str) -> Option<&DocumentTypeCustomField> {
        self.custom_fields.iter().find(|f| f.name == name)
    }
}

/// Value of a custom field on a document. People values are stored as a JSON
/// array of email addresses, everything else as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCustomField {
    pub field: DocumentTypeCustomField,
    pub value: String,
}

/// Relational document aggregate with its associations loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub google_file_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub status: DocumentStatus,
    /// Zero until the document is submitted for review.
    pub document_number: i32,
    pub product: Product,
    pub document_type: DocumentType,
    pub owner: Option<User>,
    pub approvers: Vec<User>,
    pub contributors: Vec<User>,
    pub locked: bool,
    pub shareable_as_draft: bool,
    pub imported: bool,
    pub document_created_at: DateTime<Utc>,
    pub document_modified_at: DateTime<Utc>,
    pub custom_fields: Vec<DocumentCustomField>,
    pub file_revisions: Vec<DocumentFileRevision>,
}

impl Document {
    /// Human-facing number such as `LAB-007`, or `LAB-???` when unnumbered.
    pub fn doc_number_label(&self) -> String {
        format_doc_number(&self.product.abbreviation, self.document_number)
    }

    pub fn owner_email(&self) -> Option<&str> {
        self.owner.as_ref().map(|u| u.email_address.as_str())
    }

    pub fn approver_emails(&self) -> Vec<String> {
        self.approvers
            .iter()
            .map(|u| u.email_address.clone())
            .collect()
    }

    pub fn contributor_emails(&self) -> Vec<String> {
        self.contributors
            .iter()
            .map(|u| u.email_address.clone())
            .collect()
    }

    pub fn is_approver(&self, email: &str) -> bool {
        self.approvers.iter().any(|u| u.email_address == email)
    }
}

/// Format a document number for a product abbreviation.
pub fn format_doc_number(abbreviation: &str, number: i32) -> String {
    if number == 0 {
        format!("{}-{}", abbreviation, DOC_NUMBER_PLACEHOLDER)
    } else {
        format!("{}-{:03}", abbreviation, number)
    }
}

/// Parse the numeric part of `ABC-012`. Placeholders and malformed values yield `None`.
pub fn parse_doc_number(value: &str) -> Option<i32> {
    let (_, number) = value.rsplit_once('-')?;
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_excludes_obsolete() {
        assert!(DocumentStatus::Wip < DocumentStatus::InReview);
        assert!(DocumentStatus::InReview < DocumentStatus::Approved);
        assert_eq!(
            DocumentStatus::Obsolete.partial_cmp(&DocumentStatus::Wip),
            None
        );
        assert_eq!(
            DocumentStatus::Obsolete.partial_cmp(&DocumentStatus::Obsolete),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn status_labels_accept_legacy_spelling() {
        assert_eq!(
            DocumentStatus::from_label("In Review"),
            Some(DocumentStatus::InReview)
        );
        assert_eq!(
            "in-review".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::InReview
        );
        assert_eq!(DocumentStatus::InReview.to_string(), "In-Review");
        assert!(DocumentStatus::from_label("draft").is_none());
    }

    #[test]
    fn doc_number_formatting() {
        assert_eq!(format_doc_number("LAB", 0), "LAB-???");
        assert_eq!(format_doc_number("LAB", 7), "LAB-007");
        assert_eq!(format_doc_number("LAB", 1234), "LAB-1234");
        assert_eq!(parse_doc_number("LAB-012"), Some(12));
        assert_eq!(parse_doc_number("LAB-???"), None);
        assert_eq!(parse_doc_number("LAB"), None);
    }

    #[test]
    fn unknown_custom_field_types_are_preserved() {
        assert_eq!(CustomFieldType::parse("People"), CustomFieldType::People);
        let other = CustomFieldType::parse("date");
        assert_eq!(other, CustomFieldType::Other("date".to_string()));
        assert_eq!(other.as_str(), "date");
    }
}
