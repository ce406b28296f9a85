//! Docflow background workers
//!
//! The [`Indexer`] loop keeps the `docs` search collection in sync with the
//! documents folder and, when enabled, refreshes document headers through a
//! bounded [`HeaderRefresher`] pool. Failed iterations back off exponentially up
//! to a cap and the loop keeps running until its cancellation token fires.

pub mod config;
pub mod indexer;
pub mod refresh;
pub mod watermark;

pub use config::IndexerConfig;
pub use indexer::{Indexer, IndexerRunSummary};
pub use refresh::{HeaderRefresher, RefreshSummary};
pub use watermark::Watermark;
