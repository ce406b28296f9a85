use chrono::{DateTime, Utc};
use docflow_core::constants::MAX_INDEXED_CONTENT_BYTES;
use docflow_core::models::{Document, DocumentReview, FolderKind};
use docflow_core::{AppError, Collection, LinkData, SearchDocument};
use docflow_db::{DocumentStore, WatermarkStore};
use docflow_services::HeaderRenderer;
use docflow_storage::traits::PLAIN_TEXT_MIME_TYPE;
use docflow_storage::{DocumentStorage, DriveFile, SearchIndex};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::IndexerConfig;
use crate::refresh::{HeaderRefresher, RefreshSummary};

/// Outcome of one indexer iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerRunSummary {
    pub started_at: DateTime<Utc>,
    pub draft_headers: Option<RefreshSummary>,
    pub document_headers: Option<RefreshSummary>,
    pub indexed: usize,
    pub skipped: usize,
}

/// Periodically pushes changed documents into the search index and refreshes
/// document headers.
pub struct Indexer {
    config: IndexerConfig,
    store: Arc<dyn DocumentStore>,
    watermarks: Arc<dyn WatermarkStore>,
    storage: Arc<dyn DocumentStorage>,
    search: Arc<dyn SearchIndex>,
    refresher: HeaderRefresher,
    cancel: CancellationToken,
}

impl Indexer {
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn DocumentStore>,
        watermarks: Arc<dyn WatermarkStore>,
        storage: Arc<dyn DocumentStorage>,
        search: Arc<dyn SearchIndex>,
        headers: HeaderRenderer,
        cancel: CancellationToken,
    ) -> Self {
        let refresher = HeaderRefresher::new(
            store.clone(),
            watermarks.clone(),
            storage.clone(),
            search.clone(),
            headers,
            config.max_parallel_documents,
        );
        Self {
            config,
            store,
            watermarks,
            storage,
            search,
            refresher,
            cancel,
        }
    }

    /// Spawn the indexer loop. It runs until the cancellation token fires.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(&self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            max_parallel_documents = self.config.max_parallel_documents,
            update_document_headers = self.config.update_document_headers,
            update_draft_headers = self.config.update_draft_headers,
            "Indexer started"
        );

        let mut failures: u32 = 0;
        loop {
            let delay = match self.run_once().await {
                Ok(summary) => {
                    failures = 0;
                    tracing::info!(
                        indexed = summary.indexed,
                        skipped = summary.skipped,
                        "Indexer run completed"
                    );
                    self.config.interval
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.backoff(failures);
                    tracing::error!(
                        error = %e,
                        consecutive_failures = failures,
                        retry_in_secs = delay.as_secs(),
                        "Indexer run failed"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Indexer stopped");
    }

    pub async fn run_once(&self) -> Result<IndexerRunSummary, AppError> {
        self.run_at(Utc::now()).await
    }

    /// One iteration, treating `now` as the current time.
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<IndexerRunSummary, AppError> {
        let last_full_index = self
            .watermarks
            .last_full_index()
            .await?
            .unwrap_or(DateTime::UNIX_EPOCH);
        tracing::debug!(last_full_index = %last_full_index, "starting indexer run");

        let draft_headers = if self.config.update_draft_headers {
            Some(
                self.refresher
                    .refresh(
                        FolderKind::Drafts,
                        &self.config.drafts_folder_id,
                        now,
                        self.config.quiet_window,
                        &self.cancel,
                    )
                    .await?,
            )
        } else {
            None
        };

        let document_headers = if self.config.update_document_headers {
            Some(
                self.refresher
                    .refresh(
                        FolderKind::Documents,
                        &self.config.documents_folder_id,
                        now,
                        self.config.quiet_window,
                        &self.cancel,
                    )
                    .await?,
            )
        } else {
            None
        };

        let (indexed, skipped) = self.index_documents_folder(now).await?;

        self.watermarks.set_last_full_index(now).await?;

        Ok(IndexerRunSummary {
            started_at: now,
            draft_headers,
            document_headers,
            indexed,
            skipped,
        })
    }

    /// Index every document of the documents folder changed since its watermark.
    async fn index_documents_folder(&self, now: DateTime<Utc>) -> Result<(usize, usize), AppError> {
        let folder_id = &self.config.documents_folder_id;
        let since = self
            .watermarks
            .folder_watermark(folder_id)
            .await?
            .unwrap_or(DateTime::UNIX_EPOCH);

        let files = self
            .storage
            .get_updated_docs_between(folder_id, since, now)
            .await?;
        tracing::info!(
            documents = files.len(),
            since = %since,
            "Indexing updated documents"
        );

        let mut indexed = 0;
        let mut skipped = 0;
        let mut watermark = since;
        for file in &files {
            if self.cancel.is_cancelled() {
                return Err(AppError::Internal("indexer run cancelled".to_string()));
            }
            if self.index_document(file).await? {
                indexed += 1;
            } else {
                skipped += 1;
            }
            watermark = watermark.max(file.modified_time);
        }

        // Latest modification seen, not `now`: files may reach the listing late.
        if watermark > since {
            self.watermarks
                .set_folder_watermark(folder_id, watermark)
                .await?;
        }
        Ok((indexed, skipped))
    }

    /// Returns `false` when the file has no database record.
    #[tracing::instrument(skip(self, file), fields(google_file_id = %file.id))]
    async fn index_document(&self, file: &DriveFile) -> Result<bool, AppError> {
        let Some(mut document) = self.store.get_document(&file.id).await? else {
            tracing::warn!("document not found in database, skipping");
            return Ok(false);
        };
        let reviews = self.store.get_reviews(document.id).await?;

        self.store
            .set_modified_at(&file.id, file.modified_time)
            .await?;
        document.document_modified_at = file.modified_time;

        let mut obj = self.build_projection(&document, &reviews).await?;
        obj.modified_time = file.modified_time.timestamp();

        let content = self
            .storage
            .export_body(&file.id, PLAIN_TEXT_MIME_TYPE)
            .await?;
        obj.set_content(&content, MAX_INDEXED_CONTENT_BYTES);

        self.search.save_object(Collection::Docs, &obj).await?;
        if let Some(link) = LinkData::for_document(&obj) {
            self.search.save_link(&link).await?;
        }

        tracing::info!(doc_number = %obj.doc_number, "indexed document");
        Ok(true)
    }

    async fn build_projection(
        &self,
        document: &Document,
        reviews: &[DocumentReview],
    ) -> Result<SearchDocument, AppError> {
        if self.config.use_database_for_document_data {
            return SearchDocument::from_document(document, reviews);
        }

        match self
            .search
            .get_object(Collection::Docs, &document.google_file_id)
            .await
        {
            Ok(obj) => Ok(obj),
            Err(e) if e.is_not_found() => {
                tracing::debug!("no existing search object, building from database");
                SearchDocument::from_document(document, reviews)
            }
            Err(e) => Err(e.into()),
        }
    }
}
