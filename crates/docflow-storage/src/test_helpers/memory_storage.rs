//! In-memory document storage for tests
//!
//! Files, bodies, revisions and permissions live in shared maps. Any operation can
//! be made to fail with [`InMemoryDocumentStorage::fail_on`], using the trait
//! method name (`"move_file"`, `"update_doc"`, ...). Modification times only change
//! through [`InMemoryDocumentStorage::set_modified_time`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::body::{
    Body, DocBody, DocEdit, Paragraph, ParagraphElement, StructuralElement, Table, TableCell,
    TableRow, TextRun,
};
use crate::traits::{
    DocumentStorage, DriveFile, Permission, Revision, ShareRole, StorageError, StorageResult,
    FOLDER_MIME_TYPE, GOOGLE_DOC_MIME_TYPE, SHORTCUT_MIME_TYPE,
};

#[derive(Debug, Clone)]
struct StoredFile {
    file: DriveFile,
    body: DocBody,
    text: String,
    revisions: Vec<Revision>,
    permissions: Vec<Permission>,
    shortcut_target: Option<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStorage {
    files: Arc<Mutex<HashMap<String, StoredFile>>>,
    edits: Arc<Mutex<HashMap<String, Vec<Vec<DocEdit>>>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryDocumentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    /// Add a document in `folder_id` with an empty body and one revision.
    pub fn add_document(
        &self,
        file_id: &str,
        name: &str,
        folder_id: &str,
        modified_time: DateTime<Utc>,
    ) {
        let stored = StoredFile {
            file: DriveFile {
                id: file_id.to_string(),
                name: name.to_string(),
                mime_type: GOOGLE_DOC_MIME_TYPE.to_string(),
                parents: vec![folder_id.to_string()],
                modified_time,
            },
            body: DocBody {
                document_id: file_id.to_string(),
                title: name.to_string(),
                body: Body::default(),
            },
            text: String::new(),
            revisions: vec![Revision {
                id: format!("{}-rev-1", file_id),
                modified_time,
                keep_forever: false,
            }],
            permissions: Vec::new(),
            shortcut_target: None,
        };
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), stored);
    }

    pub fn set_body(&self, file_id: &str, body: DocBody) {
        if let Some(stored) = self.files.lock().unwrap().get_mut(file_id) {
            stored.body = body;
        }
    }

    pub fn set_text(&self, file_id: &str, text: &str) {
        if let Some(stored) = self.files.lock().unwrap().get_mut(file_id) {
            stored.text = text.to_string();
        }
    }

    pub fn set_modified_time(&self, file_id: &str, modified_time: DateTime<Utc>) {
        if let Some(stored) = self.files.lock().unwrap().get_mut(file_id) {
            stored.file.modified_time = modified_time;
        }
    }

    /// Append a newer revision, which becomes the latest one.
    pub fn add_revision(&self, file_id: &str, revision_id: &str, modified_time: DateTime<Utc>) {
        if let Some(stored) = self.files.lock().unwrap().get_mut(file_id) {
            stored.revisions.push(Revision {
                id: revision_id.to_string(),
                modified_time,
                keep_forever: false,
            });
        }
    }

    /// Make every subsequent call of `operation` fail with a backend error.
    pub fn fail_on(&self, operation: &str) {
        self.failures.lock().unwrap().insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn file(&self, file_id: &str) -> Option<DriveFile> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|s| s.file.clone())
    }

    pub fn body(&self, file_id: &str) -> Option<DocBody> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|s| s.body.clone())
    }

    pub fn revision(&self, file_id: &str, revision_id: &str) -> Option<Revision> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .and_then(|s| s.revisions.iter().find(|r| r.id == revision_id).cloned())
    }

    pub fn permissions(&self, file_id: &str) -> Vec<Permission> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|s| s.permissions.clone())
            .unwrap_or_default()
    }

    /// Shortcuts currently pointing at `target_file_id`.
    pub fn shortcuts_to(&self, target_file_id: &str) -> Vec<DriveFile> {
        self.files
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.shortcut_target.as_deref() == Some(target_file_id))
            .map(|s| s.file.clone())
            .collect()
    }

    /// Edit batches applied to a document, oldest first.
    pub fn edits(&self, file_id: &str) -> Vec<Vec<DocEdit>> {
        self.edits
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful and failed calls made to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    fn enter(&self, operation: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.failures.lock().unwrap().contains(operation) {
            return Err(StorageError::BackendError(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }

    fn with_file<T>(
        &self,
        file_id: &str,
        f: impl FnOnce(&mut StoredFile) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut files = self.files.lock().unwrap();
        let stored = files
            .get_mut(file_id)
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))?;
        f(stored)
    }

    fn insert_file(&self, file: DriveFile, shortcut_target: Option<String>) -> DriveFile {
        let stored = StoredFile {
            file: file.clone(),
            body: DocBody::default(),
            text: String::new(),
            revisions: Vec::new(),
            permissions: Vec::new(),
            shortcut_target,
        };
        self.files.lock().unwrap().insert(file.id.clone(), stored);
        file
    }
}

fn header_table(index: i64, rows: &[crate::body::HeaderRow]) -> StructuralElement {
    let table_rows = rows
        .iter()
        .map(|row| TableRow {
            table_cells: row
                .cells
                .iter()
                .map(|text| TableCell {
                    content: vec![StructuralElement {
                        paragraph: Some(Paragraph {
                            elements: vec![ParagraphElement {
                                text_run: Some(TextRun {
                                    content: text.clone(),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            }],
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    StructuralElement {
        start_index: index,
        end_index: index + 1 + table_rows.len() as i64,
        paragraph: None,
        table: Some(Table {
            rows: table_rows.len() as i64,
            columns: 2,
            table_rows,
            ..Default::default()
        }),
    }
}

fn apply_edit(body: &mut DocBody, edit: &DocEdit) {
    match edit {
        DocEdit::DeleteContentRange {
            start_index,
            end_index,
        } => body
            .body
            .content
            .retain(|e| e.start_index < *start_index || e.end_index > *end_index),
        DocEdit::InsertHeaderTable { index, rows } => {
            let position = body
                .body
                .content
                .iter()
                .position(|e| e.start_index >= *index)
                .unwrap_or(body.body.content.len());
            body.body.content.insert(position, header_table(*index, rows));
        }
    }
}

#[async_trait]
impl DocumentStorage for InMemoryDocumentStorage {
    async fn get_file(&self, file_id: &str) -> StorageResult<DriveFile> {
        self.enter("get_file")?;
        self.with_file(file_id, |s| Ok(s.file.clone()))
    }

    async fn copy_file(
        &self,
        file_id: &str,
        name: &str,
        dest_folder_id: &str,
    ) -> StorageResult<DriveFile> {
        self.enter("copy_file")?;
        let source = self.with_file(file_id, |s| Ok(s.clone()))?;
        let id = self.generate_id("file");
        let mut copy = source;
        copy.file.id = id.clone();
        copy.file.name = name.to_string();
        copy.file.parents = vec![dest_folder_id.to_string()];
        copy.body.document_id = id.clone();
        copy.permissions.clear();
        let file = copy.file.clone();
        self.files.lock().unwrap().insert(id, copy);
        Ok(file)
    }

    async fn move_file(&self, file_id: &str, dest_folder_id: &str) -> StorageResult<DriveFile> {
        self.enter("move_file")?;
        self.with_file(file_id, |s| {
            s.file.parents = vec![dest_folder_id.to_string()];
            Ok(s.file.clone())
        })
    }

    async fn rename_file(&self, file_id: &str, name: &str) -> StorageResult<()> {
        self.enter("rename_file")?;
        self.with_file(file_id, |s| {
            s.file.name = name.to_string();
            Ok(())
        })
    }

    async fn share_file(&self, file_id: &str, email: &str, role: ShareRole) -> StorageResult<()> {
        self.enter("share_file")?;
        let id = self.generate_id("perm");
        self.with_file(file_id, |s| {
            s.permissions.retain(|p| p.email_address != email);
            s.permissions.push(Permission {
                id,
                email_address: email.to_string(),
                role,
            });
            Ok(())
        })
    }

    async fn share_file_with_domain(
        &self,
        file_id: &str,
        domain: &str,
        role: ShareRole,
    ) -> StorageResult<()> {
        self.enter("share_file_with_domain")?;
        let id = self.generate_id("perm");
        self.with_file(file_id, |s| {
            s.permissions.push(Permission {
                id,
                email_address: domain.to_string(),
                role,
            });
            Ok(())
        })
    }

    async fn list_permissions(&self, file_id: &str) -> StorageResult<Vec<Permission>> {
        self.enter("list_permissions")?;
        self.with_file(file_id, |s| Ok(s.permissions.clone()))
    }

    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> StorageResult<()> {
        self.enter("delete_permission")?;
        self.with_file(file_id, |s| {
            s.permissions.retain(|p| p.id != permission_id);
            Ok(())
        })
    }

    async fn delete_file(&self, file_id: &str) -> StorageResult<()> {
        self.enter("delete_file")?;
        self.files
            .lock()
            .unwrap()
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))
    }

    async fn get_doc(&self, file_id: &str) -> StorageResult<DocBody> {
        self.enter("get_doc")?;
        self.with_file(file_id, |s| Ok(s.body.clone()))
    }

    async fn update_doc(&self, file_id: &str, edits: Vec<DocEdit>) -> StorageResult<()> {
        self.enter("update_doc")?;
        self.with_file(file_id, |s| {
            for edit in &edits {
                apply_edit(&mut s.body, edit);
            }
            Ok(())
        })?;
        self.edits
            .lock()
            .unwrap()
            .entry(file_id.to_string())
            .or_default()
            .push(edits);
        Ok(())
    }

    async fn get_latest_revision(&self, file_id: &str) -> StorageResult<Revision> {
        self.enter("get_latest_revision")?;
        self.with_file(file_id, |s| {
            s.revisions
                .last()
                .cloned()
                .ok_or_else(|| StorageError::NotFound(format!("no revisions for {}", file_id)))
        })
    }

    async fn keep_revision_forever(
        &self,
        file_id: &str,
        revision_id: &str,
        keep: bool,
    ) -> StorageResult<Revision> {
        self.enter("keep_revision_forever")?;
        self.with_file(file_id, |s| {
            let revision = s
                .revisions
                .iter_mut()
                .find(|r| r.id == revision_id)
                .ok_or_else(|| StorageError::NotFound(revision_id.to_string()))?;
            revision.keep_forever = keep;
            Ok(revision.clone())
        })
    }

    async fn export_body(&self, file_id: &str, _mime_type: &str) -> StorageResult<String> {
        self.enter("export_body")?;
        self.with_file(file_id, |s| Ok(s.text.clone()))
    }

    async fn get_updated_docs_between(
        &self,
        folder_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StorageResult<Vec<DriveFile>> {
        self.enter("get_updated_docs_between")?;
        let mut files: Vec<DriveFile> = self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                s.file.mime_type == GOOGLE_DOC_MIME_TYPE
                    && s.file.parents.iter().any(|p| p == folder_id)
                    && s.file.modified_time > from
                    && s.file.modified_time <= until
            })
            .map(|s| s.file.clone())
            .collect();
        files.sort_by(|a, b| a.modified_time.cmp(&b.modified_time));
        Ok(files)
    }

    async fn get_or_create_subfolder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> StorageResult<DriveFile> {
        self.enter("get_or_create_subfolder")?;
        let existing = self
            .files
            .lock()
            .unwrap()
            .values()
            .find(|s| {
                s.file.mime_type == FOLDER_MIME_TYPE
                    && s.file.name == name
                    && s.file.parents.iter().any(|p| p == parent_id)
            })
            .map(|s| s.file.clone());
        if let Some(folder) = existing {
            return Ok(folder);
        }

        let folder = DriveFile {
            id: self.generate_id("folder"),
            name: name.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: vec![parent_id.to_string()],
            modified_time: Utc::now(),
        };
        Ok(self.insert_file(folder, None))
    }

    async fn create_shortcut(
        &self,
        target_file_id: &str,
        parent_folder_id: &str,
    ) -> StorageResult<DriveFile> {
        self.enter("create_shortcut")?;
        let target_name = self.with_file(target_file_id, |s| Ok(s.file.name.clone()))?;
        let shortcut = DriveFile {
            id: self.generate_id("shortcut"),
            name: target_name,
            mime_type: SHORTCUT_MIME_TYPE.to_string(),
            parents: vec![parent_folder_id.to_string()],
            modified_time: Utc::now(),
        };
        Ok(self.insert_file(shortcut, Some(target_file_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::HeaderRow;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn updated_docs_window_excludes_lower_bound() {
        let storage = InMemoryDocumentStorage::new();
        storage.add_document("a", "A", "docs", at(100));
        storage.add_document("b", "B", "docs", at(200));
        storage.add_document("c", "C", "drafts", at(150));

        let files = storage
            .get_updated_docs_between("docs", at(100), at(200))
            .await
            .unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn injected_failures_apply_per_operation() {
        let storage = InMemoryDocumentStorage::new();
        storage.add_document("a", "A", "drafts", at(1));
        storage.fail_on("move_file");

        assert!(storage.move_file("a", "docs").await.is_err());
        assert!(storage.get_file("a").await.is_ok());
        assert_eq!(storage.call_count("move_file"), 1);

        storage.clear_failures();
        let moved = storage.move_file("a", "docs").await.unwrap();
        assert_eq!(moved.parents, vec!["docs".to_string()]);
    }

    #[tokio::test]
    async fn header_edits_replace_the_first_table() {
        let storage = InMemoryDocumentStorage::new();
        storage.add_document("a", "A", "drafts", at(1));
        storage
            .update_doc(
                "a",
                vec![DocEdit::InsertHeaderTable {
                    index: 2,
                    rows: vec![HeaderRow::full("[LAB-???] A")],
                }],
            )
            .await
            .unwrap();

        let body = storage.body("a").unwrap();
        let (element, table) = body.first_table().unwrap();
        assert_eq!(element.start_index, 2);
        assert_eq!(table.table_rows.len(), 1);

        storage
            .update_doc(
                "a",
                vec![
                    DocEdit::DeleteContentRange {
                        start_index: element.start_index,
                        end_index: element.end_index,
                    },
                    DocEdit::InsertHeaderTable {
                        index: 2,
                        rows: vec![HeaderRow::full("[LAB-001] A"), HeaderRow::blank()],
                    },
                ],
            )
            .await
            .unwrap();

        let body = storage.body("a").unwrap();
        assert_eq!(body.body.content.len(), 1);
        assert_eq!(body.first_table().unwrap().1.table_rows.len(), 2);
        assert_eq!(storage.edits("a").len(), 2);
    }

    #[tokio::test]
    async fn subfolders_are_reused() {
        let storage = InMemoryDocumentStorage::new();
        let first = storage.get_or_create_subfolder("root", "RFC").await.unwrap();
        let second = storage.get_or_create_subfolder("root", "RFC").await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
