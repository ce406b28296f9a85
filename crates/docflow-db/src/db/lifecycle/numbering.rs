use docflow_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

/// Repository for the per (product, document type) number counters
#[derive(Clone)]
pub struct ProductNumberRepository {
    pool: PgPool,
}

impl ProductNumberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocate the next document number.
    ///
    /// Runs in its own transaction, which is committed before returning. The
    /// counter row is locked with `SELECT .. FOR UPDATE`, so concurrent callers
    /// for the same pair are serialized. Numbers are never handed back.
    #[tracing::instrument(skip(self), fields(db.table = "product_latest_document_numbers", db.operation = "upsert"))]
    pub async fn next_document_number(
        &self,
        product_id: Uuid,
        document_type_id: Uuid,
    ) -> Result<i32, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "next_document_number").await?;

        let current = sqlx::query_scalar::<Postgres, i32>(
            r#"
            SELECT latest_document_number
            FROM product_latest_document_numbers
            WHERE product_id = $1 AND document_type_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(document_type_id)
        .fetch_optional(&mut **tx)
        .await?;

        let next = match current {
            Some(latest) => {
                let next = latest + 1;
                sqlx::query(
                    r#"
                    UPDATE product_latest_document_numbers
                    SET latest_document_number = $3, updated_at = NOW()
                    WHERE product_id = $1 AND document_type_id = $2
                    "#,
                )
                .bind(product_id)
                .bind(document_type_id)
                .bind(next)
                .execute(&mut **tx)
                .await?;
                next
            }
            // A concurrent first allocation may have inserted the row after our
            // SELECT; the conflict arm then increments it instead.
            None => {
                sqlx::query_scalar::<Postgres, i32>(
                    r#"
                    INSERT INTO product_latest_document_numbers
                        (product_id, document_type_id, latest_document_number)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (product_id, document_type_id)
                    DO UPDATE SET
                        latest_document_number = product_latest_document_numbers.latest_document_number + 1,
                        updated_at = NOW()
                    RETURNING latest_document_number
                    "#,
                )
                .bind(product_id)
                .bind(document_type_id)
                .fetch_one(&mut **tx)
                .await?
            }
        };

        tx.commit().await?;

        tracing::debug!(
            product_id = %product_id,
            document_type_id = %document_type_id,
            document_number = next,
            "allocated document number"
        );
        Ok(next)
    }
}
