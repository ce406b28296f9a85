use docflow_core::models::{format_doc_number, DocumentType, Product};
use docflow_core::AppError;
use docflow_db::DocumentStore;
use std::sync::Arc;

/// Per (product, document type) document number allocation.
///
/// Each call commits its own transaction in the store. A number that was handed
/// out is never returned to the pool, even if the caller later fails.
#[derive(Clone)]
pub struct NumberAllocator {
    store: Arc<dyn DocumentStore>,
}

impl NumberAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, product, document_type), fields(product = %product.name, doc_type = %document_type.name))]
    pub async fn next_number(
        &self,
        product: &Product,
        document_type: &DocumentType,
    ) -> Result<i32, AppError> {
        let number = self
            .store
            .next_document_number(product.id, document_type.id)
            .await?;

        tracing::info!(
            doc_number = %format_doc_number(&product.abbreviation, number),
            "allocated document number"
        );
        Ok(number)
    }
}
