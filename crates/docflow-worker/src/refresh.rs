//! Header refresh
//!
//! Rewrites the header table of recently modified documents in one folder so it
//! reflects the metadata held in the search projection. Documents still being
//! edited (inside the quiet window) are left for a later pass, and documents
//! with pending header suggestions are skipped until the suggestions resolve.

use chrono::{DateTime, Utc};
use docflow_core::models::{refresh_headers_key, FolderKind};
use docflow_core::{AppError, Collection};
use docflow_db::{DocumentStore, WatermarkStore};
use docflow_services::{HeaderRenderer, LockDetector};
use docflow_storage::{DocumentStorage, DriveFile, SearchIndex};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::watermark::Watermark;

type FileQueue = Arc<Mutex<mpsc::UnboundedReceiver<DriveFile>>>;

/// Counts for one header refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub skipped_locked: usize,
}

impl RefreshSummary {
    fn merge(&mut self, other: RefreshSummary) {
        self.refreshed += other.refreshed;
        self.skipped_locked += other.skipped_locked;
    }
}

#[derive(Clone)]
pub struct HeaderRefresher {
    store: Arc<dyn DocumentStore>,
    watermarks: Arc<dyn WatermarkStore>,
    storage: Arc<dyn DocumentStorage>,
    search: Arc<dyn SearchIndex>,
    headers: HeaderRenderer,
    locks: LockDetector,
    max_parallel: usize,
}

impl HeaderRefresher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        watermarks: Arc<dyn WatermarkStore>,
        storage: Arc<dyn DocumentStorage>,
        search: Arc<dyn SearchIndex>,
        headers: HeaderRenderer,
        max_parallel: usize,
    ) -> Self {
        let locks = LockDetector::new(store.clone(), storage.clone());
        Self {
            store,
            watermarks,
            storage,
            search,
            headers,
            locks,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Refresh headers of documents in `folder_id` modified between the stored
    /// watermark and `now - quiet_window`, plus every locked document of that folder.
    ///
    /// The watermark is only persisted when every document was handled. The first
    /// worker failure cancels the rest of the batch and is returned.
    #[tracing::instrument(skip(self, kind, quiet_window, cancel), fields(folder.kind = %kind))]
    pub async fn refresh(
        &self,
        kind: FolderKind,
        folder_id: &str,
        now: DateTime<Utc>,
        quiet_window: chrono::Duration,
        cancel: &CancellationToken,
    ) -> Result<RefreshSummary, AppError> {
        let key = refresh_headers_key(folder_id);
        let since = self
            .watermarks
            .folder_watermark(&key)
            .await?
            .unwrap_or(DateTime::UNIX_EPOCH);
        let until = now - quiet_window;

        let mut files = self
            .storage
            .get_updated_docs_between(folder_id, since, until)
            .await?;

        let locked = self.store.find_locked(kind).await?;
        if !locked.is_empty() {
            tracing::info!(locked_documents = ?locked, "including locked documents in header refresh");
        }
        let mut seen: HashSet<String> = files.iter().map(|f| f.id.clone()).collect();
        for google_file_id in locked {
            if seen.contains(&google_file_id) {
                continue;
            }
            let file = self.storage.get_file(&google_file_id).await?;
            seen.insert(google_file_id);
            files.push(file);
        }

        if files.is_empty() {
            tracing::debug!("no documents need a header refresh");
            return Ok(RefreshSummary::default());
        }

        let pool_size = files.len().min(self.max_parallel);
        tracing::info!(
            documents = files.len(),
            workers = pool_size,
            "Refreshing document headers"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        for file in files {
            if tx.send(file).is_err() {
                break;
            }
        }
        drop(tx);

        let queue: FileQueue = Arc::new(Mutex::new(rx));
        let watermark = Arc::new(Watermark::new(since));
        let batch = cancel.child_token();

        let workers = (0..pool_size).map(|worker_id| {
            let refresher = self.clone();
            let queue = queue.clone();
            let watermark = watermark.clone();
            let batch = batch.clone();
            tokio::spawn(async move {
                refresher
                    .drain(worker_id, kind, queue, watermark, batch)
                    .await
            })
        });

        let mut summary = RefreshSummary::default();
        let mut first_error = None;
        for joined in join_all(workers).await {
            let outcome = joined
                .map_err(|e| AppError::Internal(format!("header refresh worker panicked: {}", e)))
                .and_then(|result| result);
            match outcome {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => {
                    batch.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if batch.is_cancelled() {
            return Err(AppError::Internal(format!(
                "header refresh of {} folder cancelled",
                kind
            )));
        }

        let latest = watermark.get();
        self.watermarks.set_folder_watermark(&key, latest).await?;
        tracing::info!(
            refreshed = summary.refreshed,
            skipped_locked = summary.skipped_locked,
            watermark = %latest,
            "Header refresh finished"
        );
        Ok(summary)
    }

    async fn drain(
        &self,
        worker_id: usize,
        kind: FolderKind,
        queue: FileQueue,
        watermark: Arc<Watermark>,
        batch: CancellationToken,
    ) -> Result<RefreshSummary, AppError> {
        let mut summary = RefreshSummary::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = batch.cancelled() => break,
                file = async { queue.lock().await.recv().await } => file,
            };
            let Some(file) = next else { break };

            let result = tokio::select! {
                biased;
                _ = batch.cancelled() => break,
                result = self.refresh_document(kind, &file, &watermark) => result,
            };
            match result {
                Ok(true) => summary.refreshed += 1,
                Ok(false) => summary.skipped_locked += 1,
                Err(e) => {
                    tracing::error!(
                        worker_id,
                        google_file_id = %file.id,
                        error = %e,
                        "header refresh failed, cancelling batch"
                    );
                    batch.cancel();
                    return Err(e);
                }
            }
        }
        Ok(summary)
    }

    /// Returns `false` when the document was skipped because it is locked.
    async fn refresh_document(
        &self,
        kind: FolderKind,
        file: &DriveFile,
        watermark: &Watermark,
    ) -> Result<bool, AppError> {
        if self.locks.is_locked(&file.id).await? {
            tracing::info!(google_file_id = %file.id, "skipping locked document");
            return Ok(false);
        }

        let (collection, is_draft) = match kind {
            FolderKind::Drafts => (Collection::Drafts, true),
            FolderKind::Documents => (Collection::Docs, false),
        };
        let doc = self.search.get_object(collection, &file.id).await?;
        self.headers
            .replace_header(self.storage.as_ref(), &doc, is_draft)
            .await?;

        let refreshed = self.storage.get_file(&file.id).await?;
        watermark.observe(refreshed.modified_time);
        tracing::info!(
            google_file_id = %file.id,
            modified_time = %refreshed.modified_time,
            "refreshed document header"
        );
        Ok(true)
    }
}
