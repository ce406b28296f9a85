//! Document header rendering
//!
//! The header is the first table of a document body. It is rebuilt from the
//! search projection on every rewrite:
//!
//! ```text
//! | [RFC] LAB-001: Title                                   |
//! | Summary: ...                                           |
//! |                                                        |
//! | Created: Jan 2, 2006         | Status: In-Review       |
//! |                                                        |
//! | Product: Labs                | Owner: a@x.io           |
//! | Contributors: ...            | Approvers: ✅ b@x.io    |
//! | Custom field: ...            | Custom field: ...       |
//! |                                                        |
//! | NOTE: This document is managed by Docflow ...          |
//! ```

use docflow_core::constants::HEADER_TABLE_DEFAULT_START_INDEX;
use docflow_core::{AppError, DocumentTypeParser, DocumentTypeRegistry, SearchDocument};
use docflow_storage::{DocEdit, DocumentStorage, HeaderRow};

use crate::context::document_url;

const MANAGED_NOTE: &str = "NOTE: This document is managed by Docflow and this header will be \
periodically overwritten using document metadata.";

#[derive(Clone)]
pub struct HeaderRenderer {
    registry: DocumentTypeRegistry,
    base_url: String,
}

impl HeaderRenderer {
    pub fn new(registry: DocumentTypeRegistry, base_url: impl Into<String>) -> Self {
        Self {
            registry,
            base_url: base_url.into(),
        }
    }

    /// Header rows for a document, using its type's parser for the custom fields.
    pub fn render(&self, doc: &SearchDocument, is_draft: bool) -> Result<Vec<HeaderRow>, AppError> {
        let parser = self.registry.get(&doc.doc_type)?;
        parser.validate(doc)?;
        Ok(self.render_with(parser.as_ref(), doc, is_draft))
    }

    fn render_with(
        &self,
        parser: &dyn DocumentTypeParser,
        doc: &SearchDocument,
        is_draft: bool,
    ) -> Vec<HeaderRow> {
        let mut rows = vec![
            HeaderRow::full(format!(
                "[{}] {}: {}",
                doc.doc_type, doc.doc_number, doc.title
            )),
            HeaderRow::full(format!("Summary: {}", doc.summary)),
            HeaderRow::blank(),
            HeaderRow::split(
                format!("Created: {}", doc.created),
                format!("Status: {}", status_label(doc)),
            ),
            HeaderRow::blank(),
            HeaderRow::split(
                format!("Product: {}", doc.product),
                format!(
                    "Owner: {}",
                    doc.owners.first().map(String::as_str).unwrap_or("N/A")
                ),
            ),
            HeaderRow::split(
                format!("Contributors: {}", doc.contributors.join(", ")),
                format!("Approvers: {}", approvers_with_marks(doc).join(", ")),
            ),
        ];

        let fields = parser.header_fields(doc);
        for pair in fields.chunks(2) {
            let left = format!("{}: {}", pair[0].label, pair[0].value);
            let right = pair
                .get(1)
                .map(|f| format!("{}: {}", f.label, f.value))
                .unwrap_or_default();
            rows.push(HeaderRow::split(left, right));
        }

        rows.push(HeaderRow::blank());
        rows.push(HeaderRow::full(format!(
            "{} {}",
            MANAGED_NOTE,
            document_url(&self.base_url, &doc.object_id, is_draft)
        )));
        rows
    }

    /// Replace the header table of the stored document with a freshly rendered one.
    /// A document without a header gets one inserted near the top.
    #[tracing::instrument(skip(self, storage, doc), fields(google_file_id = %doc.object_id))]
    pub async fn replace_header(
        &self,
        storage: &dyn DocumentStorage,
        doc: &SearchDocument,
        is_draft: bool,
    ) -> Result<(), AppError> {
        let rows = self.render(doc, is_draft)?;
        let body = storage.get_doc(&doc.object_id).await?;

        let mut edits = Vec::with_capacity(2);
        let index = match body.header_table() {
            Some((element, _)) => {
                edits.push(DocEdit::DeleteContentRange {
                    start_index: element.start_index,
                    end_index: element.end_index,
                });
                element.start_index
            }
            None => HEADER_TABLE_DEFAULT_START_INDEX,
        };
        edits.push(DocEdit::InsertHeaderTable { index, rows });

        storage.update_doc(&doc.object_id, edits).await?;
        tracing::debug!("replaced document header");
        Ok(())
    }
}

fn status_label(doc: &SearchDocument) -> &str {
    // Unknown statuses render as WIP.
    doc.document_status().map(|s| s.label()).unwrap_or("WIP")
}

fn approvers_with_marks(doc: &SearchDocument) -> Vec<String> {
    let mut approvers = doc.approver_groups.clone();
    approvers.extend(doc.approvers.iter().map(|approver| {
        if doc.approved_by.contains(approver) {
            format!("✅ {}", approver)
        } else if doc.changes_requested_by.contains(approver) {
            format!("❌ {}", approver)
        } else {
            approver.clone()
        }
    }));
    approvers
}
