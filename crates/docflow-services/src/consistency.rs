//! Cross-store consistency checking
//!
//! Compares the search projection of a document against its relational record.
//! Every divergence is collected into one [`ConsistencyReport`]; only strict mode
//! turns a non-empty report into an error.

use docflow_core::constants::DOC_NUMBER_PLACEHOLDER;
use docflow_core::models::{
    reviewers_with_status, CustomFieldType, Document, DocumentReview, DocumentStatus,
    DocumentType, ReviewStatus,
};
use docflow_core::{
    AppError, Collection, ConsistencyReport, CustomFieldValue, Divergence, SearchDocument,
};
use docflow_db::DocumentStore;
use docflow_storage::SearchIndex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Which checks to run and how to treat the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub validate_owners: bool,
    pub validate_contributors: bool,
    pub validate_product: bool,
    pub validate_reviews: bool,
    /// Return [`AppError::Inconsistent`] instead of logging divergences.
    pub strict_mode: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            validate_owners: true,
            validate_contributors: true,
            validate_product: true,
            validate_reviews: true,
            strict_mode: false,
        }
    }
}

impl CheckOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }
}

/// Result of checking one object during an audit.
#[derive(Debug)]
pub struct AuditEntry {
    pub object_id: String,
    pub outcome: Result<ConsistencyReport, AppError>,
}

#[derive(Clone)]
pub struct ConsistencyChecker {
    store: Arc<dyn DocumentStore>,
    search: Arc<dyn SearchIndex>,
}

impl ConsistencyChecker {
    pub fn new(store: Arc<dyn DocumentStore>, search: Arc<dyn SearchIndex>) -> Self {
        Self { store, search }
    }

    /// Check one document against its projection in `collection`.
    #[tracing::instrument(skip(self, options), fields(collection = %collection))]
    pub async fn check(
        &self,
        google_file_id: &str,
        collection: Collection,
        options: CheckOptions,
    ) -> Result<ConsistencyReport, AppError> {
        let projection = self.search.get_object(collection, google_file_id).await?;
        let document = self
            .store
            .get_document(google_file_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("document {} not found", google_file_id))
            })?;
        let reviews = self.store.get_reviews(document.id).await?;
        let document_type = self
            .store
            .get_document_type(&document.document_type.name)
            .await?;

        let report = compare(
            &projection,
            &document,
            &reviews,
            document_type.as_ref(),
            options,
        );
        finish(google_file_id, report, options)
    }

    /// Check every object of a collection. Failures are reported per object.
    pub async fn audit(
        &self,
        collection: Collection,
        options: CheckOptions,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let objects = self.search.browse_all(collection).await?;
        tracing::info!(
            collection = %collection,
            count = objects.len(),
            "auditing search objects"
        );

        let mut entries = Vec::with_capacity(objects.len());
        for object in objects {
            let outcome = self.check(&object.object_id, collection, options).await;
            entries.push(AuditEntry {
                object_id: object.object_id,
                outcome,
            });
        }
        Ok(entries)
    }
}

fn finish(
    google_file_id: &str,
    report: ConsistencyReport,
    options: CheckOptions,
) -> Result<ConsistencyReport, AppError> {
    if report.is_empty() {
        return Ok(report);
    }
    if options.strict_mode {
        return Err(AppError::Inconsistent(report));
    }
    tracing::warn!(
        google_file_id = %google_file_id,
        fields = ?report.fields(),
        error = %report,
        "document consistency check found issues"
    );
    Ok(report)
}

/// Compare a projection with its relational record.
pub fn compare(
    search: &SearchDocument,
    doc: &Document,
    reviews: &[DocumentReview],
    document_type: Option<&DocumentType>,
    options: CheckOptions,
) -> ConsistencyReport {
    let mut report = ConsistencyReport::new();

    exact(&mut report, "objectID", &search.object_id, &doc.google_file_id);
    exact(&mut report, "title", &search.title, &doc.title);
    exact(&mut report, "docType", &search.doc_type, &doc.document_type.name);
    exact(&mut report, "appCreated", &search.app_created, &!doc.imported);

    let db_number = if search.doc_number.is_empty() {
        String::new()
    } else {
        format!("{}-{:03}", doc.product.abbreviation, doc.document_number)
    };
    let search_number = normalize_doc_number(&search.doc_number);
    let unpadded = format!("{}-{}", doc.product.abbreviation, doc.document_number);
    if search_number != db_number && search_number != unpadded {
        report.push(Divergence::not_equal("docNumber", &search.doc_number, &db_number));
    }

    if let Some(summary) = &doc.summary {
        exact(&mut report, "summary", &search.summary, summary);
    }

    let search_status = DocumentStatus::from_label(&search.status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| search.status.clone());
    exact(&mut report, "status", &search_status, &doc.status.label().to_string());

    exact(&mut report, "product", &search.product, &doc.product.name);
    if options.validate_product && (search.product.is_empty() || doc.product.name.is_empty()) {
        optional_issue(&mut report, options, "product", "product is empty");
    }

    let search_owner = search.owners.first().map(String::as_str);
    if options.validate_owners {
        if doc.owner.is_none() {
            optional_issue(&mut report, options, "owners", "document has no owner");
        } else if search.owners.is_empty() {
            optional_issue(&mut report, options, "owners", "search object has no owner");
        }
    }
    exact(&mut report, "owners", &search_owner, &doc.owner_email());

    if options.validate_contributors && doc.contributors.is_empty() {
        tracing::warn!(google_file_id = %doc.google_file_id, "document has no contributors");
    }
    same_set(&mut report, "approvers", &search.approvers, &doc.approver_emails());
    same_set(&mut report, "contributors", &search.contributors, &doc.contributor_emails());

    if options.validate_reviews {
        same_set(
            &mut report,
            "approvedBy",
            &search.approved_by,
            &reviewers_with_status(reviews, ReviewStatus::Approved),
        );
        same_set(
            &mut report,
            "changesRequestedBy",
            &search.changes_requested_by,
            &reviewers_with_status(reviews, ReviewStatus::ChangesRequested),
        );
    }

    exact(
        &mut report,
        "createdTime",
        &search.created_time,
        &doc.document_created_at.timestamp(),
    );
    exact(
        &mut report,
        "modifiedTime",
        &search.modified_time,
        &doc.document_modified_at.timestamp(),
    );

    match document_type {
        Some(document_type) => compare_custom_fields(&mut report, search, doc, document_type),
        None => report.push(Divergence::new(
            "docType",
            format!("doc type {:?} not found", doc.document_type.name),
        )),
    }

    let db_revisions: BTreeMap<String, String> = doc
        .file_revisions
        .iter()
        .map(|r| (r.google_drive_file_revision_id.clone(), r.name.clone()))
        .collect();
    exact(&mut report, "fileRevisions", &search.file_revisions, &db_revisions);

    report
}

fn compare_custom_fields(
    report: &mut ConsistencyReport,
    search: &SearchDocument,
    doc: &Document,
    document_type: &DocumentType,
) {
    for field in &document_type.custom_fields {
        let key = field.key();
        let name = format!("customFields.{}", key);
        let search_value = search.custom_fields.get(&key);
        let db_value = doc
            .custom_fields
            .iter()
            .find(|cf| cf.field.name == field.name)
            .map(|cf| cf.value.as_str());

        match &field.field_type {
            CustomFieldType::String | CustomFieldType::Person => {
                let search_text = match search_value {
                    None => "",
                    Some(CustomFieldValue::Text(text)) => text.as_str(),
                    Some(other) => {
                        report.push(Divergence::not_equal(&name, other, db_value));
                        continue;
                    }
                };
                exact(report, &name, &search_text, &db_value.unwrap_or_default());
            }
            CustomFieldType::People => {
                let search_people = match search_value {
                    None => Vec::new(),
                    Some(CustomFieldValue::People(people)) => people.clone(),
                    Some(other) => {
                        report.push(Divergence::not_equal(&name, other, db_value));
                        continue;
                    }
                };
                let db_people: Vec<String> = match db_value {
                    None | Some("") => Vec::new(),
                    Some(raw) => match serde_json::from_str(raw) {
                        Ok(people) => people,
                        Err(e) => {
                            report.push(Divergence::new(
                                &name,
                                format!("error unmarshaling value for field {:?}: {}", key, e),
                            ));
                            continue;
                        }
                    },
                };
                same_set(report, &name, &search_people, &db_people);
            }
            CustomFieldType::Other(_) => report.push(Divergence::new(
                &name,
                format!("unknown type for custom field key {:?}", key),
            )),
        }
    }
}

/// `LAB-???` compares equal to an unnumbered document.
fn normalize_doc_number(value: &str) -> String {
    match value.strip_suffix(DOC_NUMBER_PLACEHOLDER) {
        Some(prefix) if prefix.ends_with('-') => format!("{}000", prefix),
        _ => value.to_string(),
    }
}

fn exact<T: PartialEq + std::fmt::Debug + ?Sized>(
    report: &mut ConsistencyReport,
    field: &str,
    search: &T,
    db: &T,
) {
    if search != db {
        report.push(Divergence::not_equal(field, search, db));
    }
}

fn same_set(report: &mut ConsistencyReport, field: &str, search: &[String], db: &[String]) {
    let search_set: BTreeSet<&str> = search.iter().map(String::as_str).collect();
    let db_set: BTreeSet<&str> = db.iter().map(String::as_str).collect();
    if search_set != db_set {
        report.push(Divergence::not_equal(field, search, db));
    }
}

fn optional_issue(
    report: &mut ConsistencyReport,
    options: CheckOptions,
    field: &str,
    message: &str,
) {
    if options.strict_mode {
        report.push(Divergence::new(field, message));
    } else {
        tracing::warn!(field, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docflow_core::models::{
        DocumentCustomField, DocumentFileRevision, DocumentTypeCustomField, Product, User,
    };
    use docflow_db::test_helpers::InMemoryDocumentStore;
    use docflow_storage::test_helpers::InMemorySearchIndex;
    use uuid::Uuid;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email_address: email.to_string(),
        }
    }

    fn field(name: &str, field_type: CustomFieldType) -> DocumentTypeCustomField {
        DocumentTypeCustomField {
            id: Uuid::new_v4(),
            name: name.to_string(),
            field_type,
            read_only: false,
        }
    }

    fn document() -> Document {
        let document_type = DocumentType {
            id: Uuid::new_v4(),
            name: "RFC".to_string(),
            long_name: "Request for Comments".to_string(),
            custom_fields: vec![
                field("Current Version", CustomFieldType::String),
                field("Stakeholders", CustomFieldType::People),
            ],
        };
        let id = Uuid::new_v4();
        Document {
            id,
            google_file_id: "file-1".to_string(),
            title: "Better widgets".to_string(),
            summary: Some("Widgets, but better".to_string()),
            status: DocumentStatus::InReview,
            document_number: 7,
            product: Product {
                id: Uuid::new_v4(),
                name: "Labs".to_string(),
                abbreviation: "LAB".to_string(),
            },
            custom_fields: vec![
                DocumentCustomField {
                    field: document_type.custom_fields[0].clone(),
                    value: "1.2".to_string(),
                },
                DocumentCustomField {
                    field: document_type.custom_fields[1].clone(),
                    value: r#"["s1@x.io","s2@x.io"]"#.to_string(),
                },
            ],
            document_type,
            owner: Some(user("owner@x.io")),
            approvers: vec![user("a@x.io"), user("b@x.io")],
            contributors: vec![user("c@x.io")],
            locked: false,
            shareable_as_draft: false,
            imported: false,
            document_created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            document_modified_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            file_revisions: vec![DocumentFileRevision {
                document_id: id,
                google_drive_file_revision_id: "rev-1".to_string(),
                name: "Requested review".to_string(),
                created_at: Utc::now(),
            }],
        }
    }

    fn reviews(doc: &Document) -> Vec<DocumentReview> {
        vec![DocumentReview {
            document_id: doc.id,
            user_email: "a@x.io".to_string(),
            status: ReviewStatus::Approved,
            updated_at: Utc::now(),
        }]
    }

    fn check(search: &SearchDocument, doc: &Document) -> ConsistencyReport {
        compare(
            search,
            doc,
            &reviews(doc),
            Some(&doc.document_type),
            CheckOptions::default(),
        )
    }

    #[test]
    fn matching_records_have_no_divergence() {
        let doc = document();
        let search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        assert!(check(&search, &doc).is_empty());
    }

    #[test]
    fn single_mismatch_is_reported_alone() {
        let doc = document();
        let base = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();

        let cases: Vec<(&str, Box<dyn Fn(&mut SearchDocument)>)> = vec![
            ("title", Box::new(|s: &mut SearchDocument| s.title = "Worse widgets".to_string())),
            ("docNumber", Box::new(|s: &mut SearchDocument| s.doc_number = "LAB-008".to_string())),
            ("status", Box::new(|s: &mut SearchDocument| s.status = "Approved".to_string())),
            ("approvers", Box::new(|s: &mut SearchDocument| s.approvers.push("z@x.io".to_string()))),
            ("approvedBy", Box::new(|s: &mut SearchDocument| s.approved_by.clear())),
            ("modifiedTime", Box::new(|s: &mut SearchDocument| s.modified_time += 1)),
            (
                "customFields.currentVersion",
                Box::new(|s: &mut SearchDocument| {
                    s.custom_fields.insert(
                        "currentVersion".to_string(),
                        CustomFieldValue::Text("2.0".to_string()),
                    );
                }),
            ),
            (
                "fileRevisions",
                Box::new(|s: &mut SearchDocument| s.set_file_revision("rev-2", "Approved by a@x.io")),
            ),
        ];

        for (field, mutate) in cases {
            let mut search = base.clone();
            mutate(&mut search);
            let report = check(&search, &doc);
            assert_eq!(report.fields(), vec![field], "mutating {}", field);
            assert!(report.divergences()[0]
                .message
                .starts_with(&format!("{} not equal", field)));
        }
    }

    #[test]
    fn sets_ignore_order_and_duplicates() {
        let doc = document();
        let mut search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        search.approvers = vec!["b@x.io".to_string(), "a@x.io".to_string(), "a@x.io".to_string()];
        search.custom_fields.insert(
            "stakeholders".to_string(),
            CustomFieldValue::People(vec!["s2@x.io".to_string(), "s1@x.io".to_string()]),
        );
        assert!(check(&search, &doc).is_empty());
    }

    #[test]
    fn placeholder_number_matches_unnumbered_document() {
        let mut doc = document();
        doc.status = DocumentStatus::Wip;
        doc.document_number = 0;
        let mut search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        assert_eq!(search.doc_number, "LAB-???");
        assert!(check(&search, &doc).is_empty());

        search.doc_number = "LAB-001".to_string();
        assert_eq!(check(&search, &doc).fields(), vec!["docNumber"]);
    }

    #[test]
    fn unpadded_numbers_and_legacy_status_are_accepted() {
        let doc = document();
        let mut search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        search.doc_number = "LAB-7".to_string();
        search.status = "In Review".to_string();
        assert!(check(&search, &doc).is_empty());
    }

    #[test]
    fn unknown_custom_field_types_fail_closed() {
        let mut doc = document();
        doc.document_type
            .custom_fields
            .push(field("Due Date", CustomFieldType::Other("date".to_string())));
        let search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        let report = check(&search, &doc);
        assert_eq!(report.fields(), vec!["customFields.dueDate"]);
        assert_eq!(
            report.divergences()[0].message,
            "unknown type for custom field key \"dueDate\""
        );
    }

    #[test]
    fn missing_document_type_is_reported() {
        let doc = document();
        let search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        let report = compare(&search, &doc, &reviews(&doc), None, CheckOptions::default());
        assert_eq!(report.divergences()[0].message, "doc type \"RFC\" not found");
    }

    #[test]
    fn missing_owner_only_diverges_in_strict_mode() {
        let mut doc = document();
        doc.owner = None;
        let search = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();

        let reviews = reviews(&doc);
        let lenient = compare(
            &search,
            &doc,
            &reviews,
            Some(&doc.document_type),
            CheckOptions::default(),
        );
        assert!(lenient.is_empty());

        let strict = compare(
            &search,
            &doc,
            &reviews,
            Some(&doc.document_type),
            CheckOptions::strict(),
        );
        assert_eq!(strict.fields(), vec!["owners"]);
    }

    #[test]
    fn owner_missing_from_search_object_is_flagged() {
        let doc = document();
        let reviews = reviews(&doc);
        let mut search = SearchDocument::from_document(&doc, &reviews).unwrap();
        search.owners.clear();

        let lenient = compare(
            &search,
            &doc,
            &reviews,
            Some(&doc.document_type),
            CheckOptions::default(),
        );
        assert_eq!(lenient.fields(), vec!["owners"]);

        let strict = compare(
            &search,
            &doc,
            &reviews,
            Some(&doc.document_type),
            CheckOptions::strict(),
        );
        assert_eq!(strict.fields(), vec!["owners", "owners"]);
        assert!(strict
            .divergences()
            .iter()
            .any(|d| d.message == "search object has no owner"));
    }

    #[tokio::test]
    async fn strict_mode_returns_inconsistent_error() {
        let store = InMemoryDocumentStore::new();
        let search = InMemorySearchIndex::new();
        let doc = document();
        let mut projection = SearchDocument::from_document(&doc, &reviews(&doc)).unwrap();
        projection.title = "Stale title".to_string();
        store.add_document(doc.clone());
        for review in reviews(&doc) {
            store.add_review(review);
        }
        search.insert(Collection::Docs, projection);

        let checker = ConsistencyChecker::new(Arc::new(store), Arc::new(search));
        let report = checker
            .check("file-1", Collection::Docs, CheckOptions::default())
            .await
            .unwrap();
        assert_eq!(report.fields(), vec!["title"]);

        match checker.check("file-1", Collection::Docs, CheckOptions::strict()).await {
            Err(AppError::Inconsistent(report)) => assert_eq!(report.len(), 1),
            other => panic!("expected inconsistency, got {:?}", other),
        }

        let audit = checker
            .audit(Collection::Docs, CheckOptions::default())
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].object_id, "file-1");
    }
}
