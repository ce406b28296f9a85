use docflow_core::models::{DocumentReview, ReviewStatus};
use docflow_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for reviewer verdicts
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_reviews", db.operation = "select", db.record_id = %document_id))]
    pub async fn list_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<DocumentReview>, AppError> {
        let reviews = sqlx::query_as::<Postgres, DocumentReview>(
            r#"
            SELECT r.document_id, u.email_address AS user_email, r.status, r.updated_at
            FROM document_reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.document_id = $1
            ORDER BY r.updated_at ASC, u.email_address ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Record a reviewer's verdict, replacing any earlier one.
    #[tracing::instrument(skip(self), fields(db.table = "document_reviews", db.operation = "upsert", db.record_id = %document_id))]
    pub async fn upsert(
        &self,
        document_id: Uuid,
        user_email: &str,
        status: ReviewStatus,
    ) -> Result<DocumentReview, AppError> {
        let review = sqlx::query_as::<Postgres, DocumentReview>(
            r#"
            WITH reviewer AS (
                INSERT INTO users (email_address) VALUES ($2)
                ON CONFLICT (email_address) DO UPDATE SET email_address = EXCLUDED.email_address
                RETURNING id, email_address
            )
            INSERT INTO document_reviews (document_id, user_id, status, updated_at)
            SELECT $1, reviewer.id, $3, NOW() FROM reviewer
            ON CONFLICT (document_id, user_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            RETURNING document_id, $2 AS user_email, status, updated_at
            "#,
        )
        .bind(document_id)
        .bind(user_email)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }
}
