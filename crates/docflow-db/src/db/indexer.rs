use chrono::{DateTime, Utc};
use docflow_core::models::{IndexerFolder, IndexerMetadata};
use docflow_core::AppError;
use sqlx::{PgPool, Postgres};

/// Repository for indexer watermarks
#[derive(Clone)]
pub struct IndexerRepository {
    pool: PgPool,
}

impl IndexerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "indexer_folders", db.operation = "select"))]
    pub async fn get_folder(&self, google_drive_id: &str) -> Result<Option<IndexerFolder>, AppError> {
        let folder = sqlx::query_as::<Postgres, IndexerFolder>(
            "SELECT google_drive_id, last_indexed_at FROM indexer_folders WHERE google_drive_id = $1",
        )
        .bind(google_drive_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(folder)
    }

    #[tracing::instrument(skip(self), fields(db.table = "indexer_folders", db.operation = "select"))]
    pub async fn list_folders(&self) -> Result<Vec<IndexerFolder>, AppError> {
        let folders = sqlx::query_as::<Postgres, IndexerFolder>(
            "SELECT google_drive_id, last_indexed_at FROM indexer_folders ORDER BY google_drive_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    #[tracing::instrument(skip(self), fields(db.table = "indexer_folders", db.operation = "upsert"))]
    pub async fn upsert_folder(
        &self,
        google_drive_id: &str,
        last_indexed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO indexer_folders (google_drive_id, last_indexed_at)
            VALUES ($1, $2)
            ON CONFLICT (google_drive_id) DO UPDATE SET last_indexed_at = EXCLUDED.last_indexed_at
            "#,
        )
        .bind(google_drive_id)
        .bind(last_indexed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "indexer_metadata", db.operation = "select"))]
    pub async fn get_metadata(&self) -> Result<Option<IndexerMetadata>, AppError> {
        let metadata = sqlx::query_as::<Postgres, IndexerMetadata>(
            "SELECT last_full_index_at FROM indexer_metadata WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(metadata)
    }

    #[tracing::instrument(skip(self), fields(db.table = "indexer_metadata", db.operation = "upsert"))]
    pub async fn upsert_metadata(&self, last_full_index_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO indexer_metadata (id, last_full_index_at)
            VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET last_full_index_at = EXCLUDED.last_full_index_at
            "#,
        )
        .bind(last_full_index_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
