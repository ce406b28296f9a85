//! Database transaction utilities
//!
//! Multi-statement writes (number allocation, publication records) run inside a
//! [`TransactionGuard`]. A guard that is dropped without `commit` rolls back.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};

/// A named database transaction.
///
/// # Example
///
/// ```ignore
/// use docflow_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> anyhow::Result<()> {
///     let mut tx = TransactionGuard::begin(pool, "example").await?;
///     sqlx::query("UPDATE documents SET locked = FALSE").execute(&mut **tx).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Transaction<'a, Postgres>,
    name: &'static str,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool, name: &'static str) -> Result<Self> {
        let transaction = pool
            .begin()
            .await
            .with_context(|| format!("Failed to begin {} transaction", name))?;

        tracing::trace!(transaction = name, "transaction started");
        Ok(Self { transaction, name })
    }

    pub async fn commit(self) -> Result<()> {
        let name = self.name;
        self.transaction
            .commit()
            .await
            .with_context(|| format!("Failed to commit {} transaction", name))?;
        tracing::trace!(transaction = name, "transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        let name = self.name;
        self.transaction
            .rollback()
            .await
            .with_context(|| format!("Failed to rollback {} transaction", name))?;
        tracing::debug!(transaction = name, "transaction rolled back");
        Ok(())
    }
}

impl<'a> Deref for TransactionGuard<'a> {
    type Target = Transaction<'a, Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl<'a> DerefMut for TransactionGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.transaction
    }
}
