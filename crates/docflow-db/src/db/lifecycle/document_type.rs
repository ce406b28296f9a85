use docflow_core::models::{CustomFieldType, DocumentType, DocumentTypeCustomField};
use docflow_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct DocumentTypeRow {
    id: Uuid,
    name: String,
    long_name: String,
}

#[derive(sqlx::FromRow)]
struct CustomFieldRow {
    id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    field_type: String,
    read_only: bool,
}

impl From<CustomFieldRow> for DocumentTypeCustomField {
    fn from(row: CustomFieldRow) -> Self {
        DocumentTypeCustomField {
            id: row.id,
            name: row.name,
            field_type: CustomFieldType::parse(&row.field_type),
            read_only: row.read_only,
        }
    }
}

/// Repository for document types and their custom-field schema
#[derive(Clone)]
pub struct DocumentTypeRepository {
    pool: PgPool,
}

impl DocumentTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "select"))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<DocumentType>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentTypeRow>(
            "SELECT id, name, long_name FROM document_types WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_custom_fields(row).await?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<DocumentType>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentTypeRow>(
            "SELECT id, name, long_name FROM document_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_custom_fields(row).await?)),
            None => Ok(None),
        }
    }

    /// All document types, used to build the parser registry at startup.
    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<DocumentType>, AppError> {
        let rows = sqlx::query_as::<Postgres, DocumentTypeRow>(
            "SELECT id, name, long_name FROM document_types ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut types = Vec::with_capacity(rows.len());
        for row in rows {
            types.push(self.with_custom_fields(row).await?);
        }
        Ok(types)
    }

    async fn with_custom_fields(&self, row: DocumentTypeRow) -> Result<DocumentType, AppError> {
        let fields = sqlx::query_as::<Postgres, CustomFieldRow>(
            r#"
            SELECT id, name, type, read_only
            FROM document_type_custom_fields
            WHERE document_type_id = $1
            ORDER BY position ASC, name ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(DocumentType {
            id: row.id,
            name: row.name,
            long_name: row.long_name,
            custom_fields: fields.into_iter().map(Into::into).collect(),
        })
    }
}
