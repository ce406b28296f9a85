use async_trait::async_trait;
use docflow_core::{AppError, SearchDocument};

/// Outbound notifications sent after a document enters review.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the document's approvers for a review.
    async fn review_requested(
        &self,
        doc: &SearchDocument,
        approvers: &[String],
        document_url: &str,
    ) -> Result<(), AppError>;

    /// Tell the product's subscribers that a document was published.
    async fn subscribers_notified(
        &self,
        product: &str,
        doc: &SearchDocument,
        document_url: &str,
    ) -> Result<(), AppError>;
}

/// Notifier that only records notifications in the log.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn review_requested(
        &self,
        doc: &SearchDocument,
        approvers: &[String],
        document_url: &str,
    ) -> Result<(), AppError> {
        tracing::info!(
            google_file_id = %doc.object_id,
            doc_number = %doc.doc_number,
            approvers = ?approvers,
            url = %document_url,
            "review requested"
        );
        Ok(())
    }

    async fn subscribers_notified(
        &self,
        product: &str,
        doc: &SearchDocument,
        document_url: &str,
    ) -> Result<(), AppError> {
        tracing::info!(
            google_file_id = %doc.object_id,
            product = %product,
            url = %document_url,
            "notified product subscribers"
        );
        Ok(())
    }
}
