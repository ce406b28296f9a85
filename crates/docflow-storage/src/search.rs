//! Search index abstraction
//!
//! The index holds the `drafts` and `docs` collections of [`SearchDocument`]s plus
//! the short-link collection. Writes resolve only once the backend has
//! acknowledged them, so a successful `save_object` is visible to the next
//! `get_object`.

use async_trait::async_trait;
use docflow_core::{AppError, Collection, LinkData, SearchDocument};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Object not found in {collection}: {object_id}")]
    NotFound {
        collection: String,
        object_id: String,
    },

    #[error("Malformed search object {object_id}: {message}")]
    Malformed { object_id: String, message: String },

    #[error("Search backend error: {0}")]
    BackendError(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

impl SearchError {
    pub fn not_found(collection: impl ToString, object_id: impl Into<String>) -> Self {
        SearchError::NotFound {
            collection: collection.to_string(),
            object_id: object_id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::NotFound { .. })
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::NotFound { .. } => AppError::NotFound(err.to_string()),
            other => AppError::Search(other.to_string()),
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn get_object(
        &self,
        collection: Collection,
        object_id: &str,
    ) -> SearchResult<SearchDocument>;

    /// Insert or replace an object, keyed by its `objectID`.
    async fn save_object(&self, collection: Collection, doc: &SearchDocument)
        -> SearchResult<()>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete_object(&self, collection: Collection, object_id: &str) -> SearchResult<()>;

    async fn browse_all(&self, collection: Collection) -> SearchResult<Vec<SearchDocument>>;

    async fn save_link(&self, link: &LinkData) -> SearchResult<()>;

    async fn delete_link(&self, object_id: &str) -> SearchResult<()>;
}
