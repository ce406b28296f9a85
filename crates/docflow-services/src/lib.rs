//! Docflow Services Layer
//!
//! This crate hosts the document lifecycle services: lock detection, number
//! allocation, review state transitions, header rendering, cross-store
//! consistency checks and the review publication workflow. Services are built
//! from a [`LifecycleContext`] holding the relational store, the document
//! storage provider and the search index behind their traits.

pub mod allocator;
pub mod consistency;
pub mod context;
pub mod header;
pub mod lock;
pub mod notify;
pub mod publication;
pub mod state_machine;

pub use allocator::NumberAllocator;
pub use consistency::{compare, AuditEntry, CheckOptions, ConsistencyChecker};
pub use context::LifecycleContext;
pub use header::HeaderRenderer;
pub use lock::{contains_suggestion_in_header, LockDetector};
pub use notify::{Notifier, TracingNotifier};
pub use publication::{PublicationOutcome, ReviewOutcome, ReviewService};
pub use state_machine::{apply_review, approve, begin_review, request_changes, ReviewAction};
