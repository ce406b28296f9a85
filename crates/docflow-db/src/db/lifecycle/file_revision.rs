use docflow_core::models::{DocumentFileRevision, NewFileRevision};
use docflow_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

/// Repository for pinned storage revisions
#[derive(Clone)]
pub struct FileRevisionRepository {
    pool: PgPool,
}

impl FileRevisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_file_revisions", db.operation = "select", db.record_id = %document_id))]
    pub async fn list_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<DocumentFileRevision>, AppError> {
        let revisions = sqlx::query_as::<Postgres, DocumentFileRevision>(
            r#"
            SELECT document_id, google_drive_file_revision_id, name, created_at
            FROM document_file_revisions
            WHERE document_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(revisions)
    }

    #[tracing::instrument(skip(self, revision), fields(db.table = "document_file_revisions", db.operation = "insert", db.record_id = %document_id))]
    pub async fn create(
        &self,
        document_id: Uuid,
        revision: &NewFileRevision,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut *conn, document_id, revision).await
    }

    /// Append a revision row on an existing connection or transaction.
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        document_id: Uuid,
        revision: &NewFileRevision,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO document_file_revisions (document_id, google_drive_file_revision_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (document_id, google_drive_file_revision_id, name) DO NOTHING
            "#,
        )
        .bind(document_id)
        .bind(&revision.revision_id)
        .bind(&revision.name)
        .execute(conn)
        .await?;

        Ok(())
    }
}
