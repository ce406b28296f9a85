use chrono::Utc;
use docflow_core::constants::REQUESTED_REVIEW_REVISION_LABEL;
use docflow_core::models::{
    format_doc_number, Document, DocumentStatus, NewFileRevision, PublicationRecord,
};
use docflow_core::{AppError, Collection, ConsistencyReport, LinkData, SearchDocument};
use docflow_storage::ShareRole;
use std::sync::Arc;

use crate::allocator::NumberAllocator;
use crate::consistency::{CheckOptions, ConsistencyChecker};
use crate::context::LifecycleContext;
use crate::header::HeaderRenderer;
use crate::lock::LockDetector;
use crate::notify::Notifier;
use crate::publication::compensation::{Compensation, CompensationTarget, Compensations};
use crate::state_machine::{apply_review, begin_review, ReviewAction};

/// Result of a successful publication.
#[derive(Debug)]
pub struct PublicationOutcome {
    /// Projection as saved in the `docs` collection.
    pub document: SearchDocument,
    pub document_number: i32,
    /// Post-commit steps that failed. These never undo the publication.
    pub notification_failures: Vec<String>,
    /// Divergences found by the post-publication check, if it could run.
    pub consistency: Option<ConsistencyReport>,
}

/// Result of an approve or request-changes action.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub document: SearchDocument,
    pub consistency: Option<ConsistencyReport>,
}

/// Review workflows: publishing a draft for review, approving, requesting changes.
pub struct ReviewService {
    ctx: LifecycleContext,
    notifier: Arc<dyn Notifier>,
    locks: LockDetector,
    numbers: NumberAllocator,
    headers: HeaderRenderer,
    checker: ConsistencyChecker,
}

impl ReviewService {
    pub fn new(ctx: LifecycleContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            locks: LockDetector::new(ctx.store.clone(), ctx.storage.clone()),
            numbers: NumberAllocator::new(ctx.store.clone()),
            headers: HeaderRenderer::new(ctx.registry.clone(), ctx.base_url.clone()),
            checker: ConsistencyChecker::new(ctx.store.clone(), ctx.search.clone()),
            notifier,
            ctx,
        }
    }

    /// Move a WIP draft into review.
    ///
    /// Once any external system has been changed, a failure unwinds every
    /// applied step and returns [`AppError::PublicationFailed`]. The allocated
    /// number is not given back.
    #[tracing::instrument(skip(self))]
    pub async fn publish(&self, google_file_id: &str) -> Result<PublicationOutcome, AppError> {
        self.ensure_unlocked(google_file_id).await?;
        let document = self.load_document(google_file_id).await?;
        if document.status != DocumentStatus::Wip {
            return Err(AppError::validation(format!(
                "only WIP documents can be published, status is {}",
                document.status
            )));
        }
        let draft = self
            .ctx
            .search
            .get_object(Collection::Drafts, google_file_id)
            .await?;
        if draft.document_status() != Some(DocumentStatus::Wip) {
            return Err(AppError::validation(format!(
                "draft search object has status {:?}",
                draft.status
            )));
        }

        let number = self
            .numbers
            .next_number(&document.product, &document.document_type)
            .await?;

        let mut compensations = Compensations::new();
        let published = match self
            .publish_steps(&document, &draft, number, &mut compensations)
            .await
        {
            Ok(published) => published,
            Err(err) => return Err(self.unwind(err, compensations).await),
        };
        tracing::info!(
            doc_number = %published.doc_number,
            "document published for review"
        );

        let notification_failures = self.notify_reviewers(&published).await;
        let consistency = self.post_check(google_file_id).await;

        Ok(PublicationOutcome {
            document: published,
            document_number: number,
            notification_failures,
            consistency,
        })
    }

    async fn publish_steps(
        &self,
        document: &Document,
        draft: &SearchDocument,
        number: i32,
        compensations: &mut Compensations,
    ) -> Result<SearchDocument, AppError> {
        let file_id = document.google_file_id.as_str();
        let storage = self.ctx.storage.as_ref();
        let search = self.ctx.search.as_ref();

        let mut published = draft.clone();
        begin_review(
            &mut published,
            &format_doc_number(&document.product.abbreviation, number),
        )?;

        self.headers
            .replace_header(storage, &published, false)
            .await?;
        let mut reset = draft.clone();
        reset.doc_number = format_doc_number(&document.product.abbreviation, 0);
        reset.set_status(DocumentStatus::Wip);
        compensations.push(Compensation::RestoreHeader { draft: reset });

        let file = storage.get_file(file_id).await?;
        let created_at = Utc::now();
        published.set_created(created_at);
        published.modified_time = file.modified_time.timestamp();

        let revision = storage.get_latest_revision(file_id).await?;
        storage
            .keep_revision_forever(file_id, &revision.id, true)
            .await?;
        compensations.push(Compensation::UnpinRevision {
            file_id: file_id.to_string(),
            revision_id: revision.id.clone(),
        });
        published.set_file_revision(&revision.id, REQUESTED_REVIEW_REVISION_LABEL);

        search.save_object(Collection::Docs, &published).await?;
        compensations.push(Compensation::RestoreDraftObject {
            original: draft.clone(),
        });
        search.delete_object(Collection::Drafts, file_id).await?;

        storage
            .move_file(file_id, &self.ctx.folders.documents_folder_id)
            .await?;
        compensations.push(Compensation::MoveBackToDrafts {
            file_id: file_id.to_string(),
        });

        let doc_type_folder = storage
            .get_or_create_subfolder(&self.ctx.folders.shortcuts_folder_id, &published.doc_type)
            .await?;
        let product_folder = storage
            .get_or_create_subfolder(&doc_type_folder.id, &published.product)
            .await?;
        let shortcut = storage.create_shortcut(file_id, &product_folder.id).await?;
        compensations.push(Compensation::DeleteShortcut {
            shortcut_id: shortcut.id,
        });

        if let Some(link) = LinkData::for_document(&published) {
            search.save_link(&link).await?;
            compensations.push(Compensation::DeleteRedirect {
                object_id: link.object_id,
            });
        }

        let record = PublicationRecord {
            document_number: number,
            document_created_at: created_at,
            document_modified_at: file.modified_time,
            revision: NewFileRevision::new(revision.id, REQUESTED_REVIEW_REVISION_LABEL),
        };
        self.ctx.store.record_publication(file_id, &record).await?;

        Ok(published)
    }

    async fn unwind(&self, err: AppError, compensations: Compensations) -> AppError {
        if compensations.is_empty() {
            return err;
        }
        tracing::warn!(
            error = %err,
            steps = compensations.len(),
            "publication failed, rolling back"
        );

        let target = CompensationTarget {
            storage: self.ctx.storage.as_ref(),
            search: self.ctx.search.as_ref(),
            headers: &self.headers,
            drafts_folder_id: &self.ctx.folders.drafts_folder_id,
        };
        let failures = compensations.run(&target).await;
        if !failures.is_empty() {
            tracing::error!(errors = %failures, "publication rollback incomplete");
        }

        AppError::PublicationFailed {
            source: Box::new(err),
            compensation: failures,
        }
    }

    async fn notify_reviewers(&self, published: &SearchDocument) -> Vec<String> {
        let file_id = published.object_id.as_str();
        let url = self.ctx.document_url(file_id, false);
        let mut failures = Vec::new();

        for approver in &published.approvers {
            if let Err(e) = self
                .ctx
                .storage
                .share_file(file_id, approver, ShareRole::Writer)
                .await
            {
                tracing::error!(
                    approver = %approver,
                    error = %e,
                    "error sharing file with approver"
                );
                failures.push(format!("share with {}: {}", approver, e));
            }
        }

        if let Err(e) = self
            .notifier
            .review_requested(published, &published.approvers, &url)
            .await
        {
            tracing::error!(error = %e, "error notifying approvers");
            failures.push(format!("notify approvers: {}", e));
        }

        if let Err(e) = self
            .notifier
            .subscribers_notified(&published.product, published, &url)
            .await
        {
            tracing::error!(error = %e, "error notifying product subscribers");
            failures.push(format!("notify subscribers: {}", e));
        }

        failures
    }

    /// Record an approval from `actor`.
    pub async fn approve(
        &self,
        google_file_id: &str,
        actor: &str,
    ) -> Result<ReviewOutcome, AppError> {
        self.review(google_file_id, actor, ReviewAction::Approve)
            .await
    }

    /// Record a change request from `actor`.
    pub async fn request_changes(
        &self,
        google_file_id: &str,
        actor: &str,
    ) -> Result<ReviewOutcome, AppError> {
        self.review(google_file_id, actor, ReviewAction::RequestChanges)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn review(
        &self,
        google_file_id: &str,
        actor: &str,
        action: ReviewAction,
    ) -> Result<ReviewOutcome, AppError> {
        self.ensure_unlocked(google_file_id).await?;
        let document = self.load_document(google_file_id).await?;
        let mut projection = self
            .ctx
            .search
            .get_object(Collection::Docs, google_file_id)
            .await?;

        apply_review(&mut projection, action, actor)?;

        let label = action.revision_label(actor);
        let revision = self.ctx.storage.get_latest_revision(google_file_id).await?;
        self.ctx
            .storage
            .keep_revision_forever(google_file_id, &revision.id, true)
            .await?;
        projection.set_file_revision(&revision.id, &label);
        self.ctx
            .store
            .add_file_revision(document.id, &NewFileRevision::new(revision.id, label))
            .await?;

        self.ctx
            .store
            .upsert_review(document.id, actor, action.review_status())
            .await?;

        self.headers
            .replace_header(self.ctx.storage.as_ref(), &projection, false)
            .await?;
        self.ctx
            .search
            .save_object(Collection::Docs, &projection)
            .await?;
        tracing::info!(actor = %actor, review = %action.review_status(), "review recorded");

        let consistency = self.post_check(google_file_id).await;
        Ok(ReviewOutcome {
            document: projection,
            consistency,
        })
    }

    async fn ensure_unlocked(&self, google_file_id: &str) -> Result<(), AppError> {
        if self.locks.is_locked(google_file_id).await? {
            return Err(AppError::Locked(format!(
                "document {} has suggestions in its header",
                google_file_id
            )));
        }
        Ok(())
    }

    async fn load_document(&self, google_file_id: &str) -> Result<Document, AppError> {
        self.ctx
            .store
            .get_document(google_file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("document {} not found", google_file_id)))
    }

    async fn post_check(&self, google_file_id: &str) -> Option<ConsistencyReport> {
        match self
            .checker
            .check(google_file_id, Collection::Docs, CheckOptions::default())
            .await
        {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "error running document consistency check");
                None
            }
        }
    }
}
