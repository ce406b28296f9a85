use chrono::{DateTime, Utc};
use docflow_core::models::{
    CustomFieldType, Document, DocumentCustomField, DocumentStatus, DocumentTypeCustomField,
    FolderKind, Product, PublicationRecord, User,
};
use docflow_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::lifecycle::document_type::DocumentTypeRepository;
use crate::db::lifecycle::file_revision::FileRevisionRepository;
use crate::db::transaction::TransactionGuard;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    google_file_id: String,
    title: String,
    summary: Option<String>,
    status: DocumentStatus,
    document_number: i32,
    product_id: Uuid,
    product_name: String,
    product_abbreviation: String,
    document_type_id: Uuid,
    owner_id: Option<Uuid>,
    owner_email: Option<String>,
    locked: bool,
    shareable_as_draft: bool,
    imported: bool,
    document_created_at: DateTime<Utc>,
    document_modified_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CustomFieldValueRow {
    id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    field_type: String,
    read_only: bool,
    value: String,
}

/// Repository for documents and their associations
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
    document_types: DocumentTypeRepository,
    file_revisions: FileRevisionRepository,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            document_types: DocumentTypeRepository::new(pool.clone()),
            file_revisions: FileRevisionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Load a document by storage file id, with product, type, people,
    /// custom fields and pinned revisions.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn get_by_google_file_id(
        &self,
        google_file_id: &str,
    ) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            SELECT d.id, d.google_file_id, d.title, d.summary, d.status, d.document_number,
                   p.id AS product_id, p.name AS product_name, p.abbreviation AS product_abbreviation,
                   d.document_type_id, d.owner_id, o.email_address AS owner_email,
                   d.locked, d.shareable_as_draft, d.imported,
                   d.document_created_at, d.document_modified_at
            FROM documents d
            JOIN products p ON p.id = d.product_id
            LEFT JOIN users o ON o.id = d.owner_id
            WHERE d.google_file_id = $1
            "#,
        )
        .bind(google_file_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document_type = self
            .document_types
            .get_by_id(row.document_type_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "document type {} of document {} not found",
                    row.document_type_id, google_file_id
                ))
            })?;

        let approvers = self.list_people("document_approvers", row.id).await?;
        let contributors = self.list_people("document_contributors", row.id).await?;
        let custom_fields = self.list_custom_fields(row.id).await?;
        let file_revisions = self.file_revisions.list_for_document(row.id).await?;

        let owner = match (row.owner_id, row.owner_email) {
            (Some(id), Some(email_address)) => Some(User { id, email_address }),
            _ => None,
        };

        Ok(Some(Document {
            id: row.id,
            google_file_id: row.google_file_id,
            title: row.title,
            summary: row.summary,
            status: row.status,
            document_number: row.document_number,
            product: Product {
                id: row.product_id,
                name: row.product_name,
                abbreviation: row.product_abbreviation,
            },
            document_type,
            owner,
            approvers,
            contributors,
            locked: row.locked,
            shareable_as_draft: row.shareable_as_draft,
            imported: row.imported,
            document_created_at: row.document_created_at,
            document_modified_at: row.document_modified_at,
            custom_fields,
            file_revisions,
        }))
    }

    async fn list_people(&self, table: &str, document_id: Uuid) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT u.id, u.email_address FROM {} x JOIN users u ON u.id = x.user_id \
             WHERE x.document_id = $1 ORDER BY u.email_address ASC",
            table
        );
        let users = sqlx::query_as::<Postgres, User>(&query)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_custom_fields(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<DocumentCustomField>, AppError> {
        let rows = sqlx::query_as::<Postgres, CustomFieldValueRow>(
            r#"
            SELECT f.id, f.name, f.type, f.read_only, v.value
            FROM document_custom_fields v
            JOIN document_type_custom_fields f ON f.id = v.document_type_custom_field_id
            WHERE v.document_id = $1
            ORDER BY f.position ASC, f.name ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentCustomField {
                field: DocumentTypeCustomField {
                    id: row.id,
                    name: row.name,
                    field_type: CustomFieldType::parse(&row.field_type),
                    read_only: row.read_only,
                },
                value: row.value,
            })
            .collect())
    }

    /// Persist only the `locked` column.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update"))]
    pub async fn set_locked(&self, google_file_id: &str, locked: bool) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE documents SET locked = $2, updated_at = NOW() WHERE google_file_id = $1",
        )
        .bind(google_file_id)
        .bind(locked)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "document {} not found",
                google_file_id
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update"))]
    pub async fn set_modified_at(
        &self,
        google_file_id: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE documents SET document_modified_at = $2, updated_at = NOW()
            WHERE google_file_id = $1
            "#,
        )
        .bind(google_file_id)
        .bind(modified_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Storage ids of locked documents belonging to a watched folder. Drafts are
    /// WIP documents; the documents folder holds everything past WIP.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    pub async fn find_locked(&self, folder: FolderKind) -> Result<Vec<String>, AppError> {
        let query = match folder {
            FolderKind::Drafts => {
                "SELECT google_file_id FROM documents WHERE locked AND status = 'wip' ORDER BY google_file_id"
            }
            FolderKind::Documents => {
                "SELECT google_file_id FROM documents WHERE locked AND status <> 'wip' ORDER BY google_file_id"
            }
        };

        let ids = sqlx::query_scalar::<Postgres, String>(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Move a WIP document into review: status, number, timestamps and the
    /// requested-review revision row are written in one transaction.
    #[tracing::instrument(skip(self, record), fields(db.table = "documents", db.operation = "update", document_number = record.document_number))]
    pub async fn record_publication(
        &self,
        google_file_id: &str,
        record: &PublicationRecord,
    ) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "record_publication").await?;

        let document_id = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            UPDATE documents
            SET status = $2,
                document_number = $3,
                document_created_at = $4,
                document_modified_at = $5,
                updated_at = NOW()
            WHERE google_file_id = $1 AND status = 'wip'
            RETURNING id
            "#,
        )
        .bind(google_file_id)
        .bind(DocumentStatus::InReview)
        .bind(record.document_number)
        .bind(record.document_created_at)
        .bind(record.document_modified_at)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(document_id) = document_id else {
            tx.rollback().await?;
            return Err(AppError::validation(format!(
                "document {} is no longer a draft",
                google_file_id
            )));
        };

        FileRevisionRepository::insert(&mut **tx, document_id, &record.revision).await?;

        tx.commit().await?;
        Ok(())
    }

    pub fn file_revisions(&self) -> &FileRevisionRepository {
        &self.file_revisions
    }

    pub fn document_types(&self) -> &DocumentTypeRepository {
        &self.document_types
    }
}
