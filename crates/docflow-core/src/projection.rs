//! Search index projection
//!
//! [`SearchDocument`] is the denormalized copy of a document stored in the search
//! index. It is an explicit schema rather than a free-form map: every field the
//! index carries is named here, custom fields are typed, and `schemaVersion`
//! records which layout an object was written with.

use chrono::{DateTime, Utc};
use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::{DOCS_COLLECTION, DOC_NUMBER_PLACEHOLDER, DRAFTS_COLLECTION};
use crate::error::AppError;
use crate::models::{CustomFieldType, Document, DocumentReview, DocumentStatus, ReviewStatus};

/// Layout version written by this crate.
pub const SEARCH_SCHEMA_VERSION: u32 = 1;

/// The two document collections of the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Drafts,
    Docs,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Drafts => DRAFTS_COLLECTION,
            Collection::Docs => DOCS_COLLECTION,
        }
    }

    /// Collection a document with the given status belongs to.
    pub fn for_status(status: DocumentStatus) -> Self {
        if status.is_published() {
            Collection::Docs
        } else {
            Collection::Drafts
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Value of a custom field in the projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Text(String),
    People(Vec<String>),
}

impl CustomFieldValue {
    /// Rendering used in document headers.
    pub fn display(&self) -> String {
        match self {
            CustomFieldValue::Text(s) => s.clone(),
            CustomFieldValue::People(people) => people.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchDocument {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub doc_type: String,
    pub doc_number: String,
    pub app_created: bool,
    pub approved_by: Vec<String>,
    pub approvers: Vec<String>,
    pub approver_groups: Vec<String>,
    pub changes_requested_by: Vec<String>,
    pub contributors: Vec<String>,
    pub content: String,
    pub created: String,
    pub created_time: i64,
    pub custom_fields: BTreeMap<String, CustomFieldValue>,
    pub file_revisions: BTreeMap<String, String>,
    pub locked: bool,
    pub modified_time: i64,
    pub owners: Vec<String>,
    pub owner_photos: Vec<String>,
    pub product: String,
    pub summary: String,
    pub status: String,
    pub tags: Vec<String>,
    pub thumbnail_link: String,
    pub schema_version: u32,
}

impl SearchDocument {
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            schema_version: SEARCH_SCHEMA_VERSION,
            ..Default::default()
        }
    }

    /// Build the projection of a relational document and its reviews.
    pub fn from_document(doc: &Document, reviews: &[DocumentReview]) -> Result<Self, AppError> {
        let mut obj = SearchDocument::new(doc.google_file_id.clone());
        obj.title = doc.title.clone();
        obj.doc_type = doc.document_type.name.clone();
        obj.doc_number = doc.doc_number_label();
        obj.app_created = !doc.imported;
        obj.approvers = doc.approver_emails();
        obj.contributors = doc.contributor_emails();
        for review in reviews {
            match review.status {
                ReviewStatus::Approved => obj.approved_by.push(review.user_email.clone()),
                ReviewStatus::ChangesRequested => {
                    obj.changes_requested_by.push(review.user_email.clone())
                }
            }
        }
        obj.set_created(doc.document_created_at);
        obj.modified_time = doc.document_modified_at.timestamp();
        obj.locked = doc.locked;
        obj.owners = doc.owner_email().map(|e| vec![e.to_string()]).unwrap_or_default();
        obj.product = doc.product.name.clone();
        obj.summary = doc.summary.clone().unwrap_or_default();
        obj.status = doc.status.label().to_string();

        for cf in &doc.custom_fields {
            let value = match cf.field.field_type {
                CustomFieldType::People => {
                    let people: Vec<String> = serde_json::from_str(&cf.value).map_err(|e| {
                        AppError::InvalidInput(format!(
                            "error unmarshaling value for field {:?}: {}",
                            cf.field.name, e
                        ))
                    })?;
                    CustomFieldValue::People(people)
                }
                CustomFieldType::Person | CustomFieldType::String => {
                    CustomFieldValue::Text(cf.value.clone())
                }
                CustomFieldType::Other(_) => continue,
            };
            obj.custom_fields.insert(cf.field.key(), value);
        }

        for rev in &doc.file_revisions {
            obj.file_revisions
                .insert(rev.google_drive_file_revision_id.clone(), rev.name.clone());
        }

        Ok(obj)
    }

    /// Parsed status, accepting legacy labels.
    pub fn document_status(&self) -> Option<DocumentStatus> {
        DocumentStatus::from_label(&self.status)
    }

    pub fn set_status(&mut self, status: DocumentStatus) {
        self.status = status.label().to_string();
    }

    pub fn set_created(&mut self, at: DateTime<Utc>) {
        self.created = at.format("%b %-d, %Y").to_string();
        self.created_time = at.timestamp();
    }

    pub fn set_file_revision(&mut self, revision_id: &str, name: &str) {
        self.file_revisions
            .insert(revision_id.to_string(), name.to_string());
    }

    /// Store exported body text, truncated to at most `max_bytes`.
    pub fn set_content(&mut self, text: &str, max_bytes: usize) {
        self.content = truncate_to_char_boundary(text, max_bytes).to_string();
    }

    /// Whether a real document number (not a placeholder) has been assigned.
    pub fn is_numbered(&self) -> bool {
        !self.doc_number.is_empty() && !self.doc_number.ends_with(DOC_NUMBER_PLACEHOLDER)
    }
}

/// Projection key of a custom field declared with the given display name.
pub fn custom_field_key(name: &str) -> String {
    name.to_lower_camel_case()
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Short-link redirect stored in the links collection: `/rfc/lab-001` -> file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(rename = "documentID")]
    pub document_id: String,
}

impl LinkData {
    pub fn redirect_key(doc_type: &str, doc_number: &str) -> String {
        format!("/{}/{}", doc_type.to_lowercase(), doc_number.to_lowercase())
    }

    /// Redirect for a numbered document. Unnumbered documents have no short link.
    pub fn for_document(doc: &SearchDocument) -> Option<Self> {
        if !doc.is_numbered() {
            return None;
        }
        Some(Self {
            object_id: Self::redirect_key(&doc.doc_type, &doc.doc_number),
            document_id: doc.object_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_field_keys_are_lower_camel_case() {
        assert_eq!(custom_field_key("Target Version"), "targetVersion");
        assert_eq!(custom_field_key("Stakeholders"), "stakeholders");
        assert_eq!(custom_field_key("current_version"), "currentVersion");
    }

    #[test]
    fn deserializes_legacy_objects_without_schema_version() {
        let obj: SearchDocument = serde_json::from_value(json!({
            "objectID": "file-1",
            "title": "Hello",
            "docType": "RFC",
            "docNumber": "LAB-???",
            "status": "In Review",
            "customFields": {
                "stakeholders": ["a@example.com"],
                "currentVersion": "1.2"
            }
        }))
        .unwrap();

        assert_eq!(obj.schema_version, 0);
        assert_eq!(obj.document_status(), Some(DocumentStatus::InReview));
        assert_eq!(
            obj.custom_fields.get("stakeholders"),
            Some(&CustomFieldValue::People(vec!["a@example.com".to_string()]))
        );
        assert_eq!(
            obj.custom_fields.get("currentVersion"),
            Some(&CustomFieldValue::Text("1.2".to_string()))
        );
        assert!(!obj.is_numbered());
    }

    #[test]
    fn serializes_with_index_field_names() {
        let mut obj = SearchDocument::new("file-1");
        obj.doc_number = "LAB-001".to_string();
        let value = serde_json::to_value(&obj).unwrap();
        assert_eq!(value["objectID"], "file-1");
        assert_eq!(value["docNumber"], "LAB-001");
        assert_eq!(value["schemaVersion"], SEARCH_SCHEMA_VERSION);
        assert!(value.get("changesRequestedBy").is_some());
    }

    #[test]
    fn content_truncation_respects_char_boundaries() {
        assert_eq!(truncate_to_char_boundary("hello", 10), "hello");
        assert_eq!(truncate_to_char_boundary("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off to the previous boundary.
        assert_eq!(truncate_to_char_boundary("aé", 2), "a");
    }

    #[test]
    fn redirect_links_only_for_numbered_documents() {
        let mut obj = SearchDocument::new("file-1");
        obj.doc_type = "RFC".to_string();
        obj.doc_number = "LAB-???".to_string();
        assert!(LinkData::for_document(&obj).is_none());

        obj.doc_number = "LAB-001".to_string();
        let link = LinkData::for_document(&obj).unwrap();
        assert_eq!(link.object_id, "/rfc/lab-001");
        assert_eq!(link.document_id, "file-1");
    }
}
