//! Review publication workflow
//!
//! Publishing a draft touches the document body, its revisions, both search
//! collections, the storage folders and the relational store. None of these
//! share a transaction, so the workflow keeps a compensation log and unwinds it
//! when a later step fails.

mod compensation;
mod service;

pub use compensation::{Compensation, CompensationTarget, Compensations};
pub use service::{PublicationOutcome, ReviewOutcome, ReviewService};
