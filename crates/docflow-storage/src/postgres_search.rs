//! Postgres-backed search index
//!
//! Objects are stored as JSONB rows in `search_objects`, keyed by
//! `(collection, object_id)`. Short links share the table under the `links`
//! collection. Every write is a single autocommitted statement, so it is
//! acknowledged before the call returns.

use async_trait::async_trait;
use docflow_core::constants::LINKS_COLLECTION;
use docflow_core::{Collection, LinkData, SearchDocument};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use crate::search::{SearchError, SearchIndex, SearchResult};

#[derive(Clone)]
pub struct PgSearchIndex {
    pool: PgPool,
}

impl PgSearchIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a short link by its redirect key.
    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "select"))]
    pub async fn get_link(&self, object_id: &str) -> SearchResult<Option<LinkData>> {
        let row = sqlx::query_scalar::<Postgres, Json<LinkData>>(
            r#"
            SELECT data FROM search_objects
            WHERE collection = $1 AND object_id = $2
            "#,
        )
        .bind(LINKS_COLLECTION)
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(row.map(|Json(link)| link))
    }

    async fn upsert(
        &self,
        collection: &str,
        object_id: &str,
        data: serde_json::Value,
    ) -> SearchResult<()> {
        sqlx::query(
            r#"
            INSERT INTO search_objects (collection, object_id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, object_id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(object_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn delete(&self, collection: &str, object_id: &str) -> SearchResult<()> {
        sqlx::query("DELETE FROM search_objects WHERE collection = $1 AND object_id = $2")
            .bind(collection)
            .bind(object_id)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        Ok(())
    }
}

fn backend_error(err: sqlx::Error) -> SearchError {
    SearchError::BackendError(err.to_string())
}

fn decode(object_id: &str, value: serde_json::Value) -> SearchResult<SearchDocument> {
    serde_json::from_value(value).map_err(|e| SearchError::Malformed {
        object_id: object_id.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl SearchIndex for PgSearchIndex {
    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "select"))]
    async fn get_object(
        &self,
        collection: Collection,
        object_id: &str,
    ) -> SearchResult<SearchDocument> {
        let row = sqlx::query_scalar::<Postgres, serde_json::Value>(
            r#"
            SELECT data FROM search_objects
            WHERE collection = $1 AND object_id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        match row {
            Some(value) => decode(object_id, value),
            None => Err(SearchError::not_found(collection, object_id)),
        }
    }

    #[tracing::instrument(skip(self, doc), fields(db.table = "search_objects", db.operation = "upsert", object_id = %doc.object_id))]
    async fn save_object(
        &self,
        collection: Collection,
        doc: &SearchDocument,
    ) -> SearchResult<()> {
        let data = serde_json::to_value(doc).map_err(|e| SearchError::Malformed {
            object_id: doc.object_id.clone(),
            message: e.to_string(),
        })?;
        self.upsert(collection.as_str(), &doc.object_id, data).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "delete"))]
    async fn delete_object(&self, collection: Collection, object_id: &str) -> SearchResult<()> {
        self.delete(collection.as_str(), object_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "select"))]
    async fn browse_all(&self, collection: Collection) -> SearchResult<Vec<SearchDocument>> {
        let rows = sqlx::query_as::<Postgres, (String, serde_json::Value)>(
            r#"
            SELECT object_id, data FROM search_objects
            WHERE collection = $1
            ORDER BY object_id
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        rows.into_iter()
            .map(|(object_id, value)| decode(&object_id, value))
            .collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "upsert"))]
    async fn save_link(&self, link: &LinkData) -> SearchResult<()> {
        let data = serde_json::to_value(link).map_err(|e| SearchError::Malformed {
            object_id: link.object_id.clone(),
            message: e.to_string(),
        })?;
        self.upsert(LINKS_COLLECTION, &link.object_id, data).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "search_objects", db.operation = "delete"))]
    async fn delete_link(&self, object_id: &str) -> SearchResult<()> {
        self.delete(LINKS_COLLECTION, object_id).await
    }
}
