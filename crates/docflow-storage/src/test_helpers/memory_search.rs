//! In-memory search index for tests

use async_trait::async_trait;
use docflow_core::{Collection, LinkData, SearchDocument};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::search::{SearchError, SearchIndex, SearchResult};

#[derive(Clone, Default)]
pub struct InMemorySearchIndex {
    objects: Arc<Mutex<HashMap<(Collection, String), SearchDocument>>>,
    links: Arc<Mutex<HashMap<String, LinkData>>>,
    failures: Arc<Mutex<HashSet<String>>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: Collection, doc: SearchDocument) {
        self.objects
            .lock()
            .unwrap()
            .insert((collection, doc.object_id.clone()), doc);
    }

    pub fn object(&self, collection: Collection, object_id: &str) -> Option<SearchDocument> {
        self.objects
            .lock()
            .unwrap()
            .get(&(collection, object_id.to_string()))
            .cloned()
    }

    pub fn contains(&self, collection: Collection, object_id: &str) -> bool {
        self.object(collection, object_id).is_some()
    }

    pub fn link(&self, object_id: &str) -> Option<LinkData> {
        self.links.lock().unwrap().get(object_id).cloned()
    }

    pub fn links(&self) -> Vec<LinkData> {
        self.links.lock().unwrap().values().cloned().collect()
    }

    /// Make every subsequent call of `operation` fail. `save_object` and
    /// `delete_object` may be scoped to one collection as `"save_object:docs"`.
    pub fn fail_on(&self, operation: &str) {
        self.failures.lock().unwrap().insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn enter(&self, operation: &str, collection: Option<Collection>) -> SearchResult<()> {
        let failures = self.failures.lock().unwrap();
        let scoped = collection.map(|c| format!("{}:{}", operation, c));
        if failures.contains(operation) || scoped.is_some_and(|s| failures.contains(&s)) {
            return Err(SearchError::BackendError(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn get_object(
        &self,
        collection: Collection,
        object_id: &str,
    ) -> SearchResult<SearchDocument> {
        self.enter("get_object", Some(collection))?;
        self.object(collection, object_id)
            .ok_or_else(|| SearchError::not_found(collection, object_id))
    }

    async fn save_object(
        &self,
        collection: Collection,
        doc: &SearchDocument,
    ) -> SearchResult<()> {
        self.enter("save_object", Some(collection))?;
        self.insert(collection, doc.clone());
        Ok(())
    }

    async fn delete_object(&self, collection: Collection, object_id: &str) -> SearchResult<()> {
        self.enter("delete_object", Some(collection))?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(collection, object_id.to_string()));
        Ok(())
    }

    async fn browse_all(&self, collection: Collection) -> SearchResult<Vec<SearchDocument>> {
        self.enter("browse_all", Some(collection))?;
        let mut docs: Vec<SearchDocument> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|(_, doc)| doc.clone())
            .collect();
        docs.sort_by(|a, b| a.object_id.cmp(&b.object_id));
        Ok(docs)
    }

    async fn save_link(&self, link: &LinkData) -> SearchResult<()> {
        self.enter("save_link", None)?;
        self.links
            .lock()
            .unwrap()
            .insert(link.object_id.clone(), link.clone());
        Ok(())
    }

    async fn delete_link(&self, object_id: &str) -> SearchResult<()> {
        self.enter("delete_link", None)?;
        self.links.lock().unwrap().remove(object_id);
        Ok(())
    }
}
