//! Error types module
//!
//! All failures surfaced by the document lifecycle core are unified under [`AppError`].
//! Validation and lock failures map to client errors, provider and database failures
//! map to server errors, and consistency divergence is carried as an aggregated
//! [`ConsistencyReport`] that callers usually only log.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::fmt;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and divergence reports
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to a caller.
///
/// The HTTP surface is not part of this workspace; the status codes are the
/// 4xx/5xx equivalents a handler layer is expected to use.
pub trait ErrorMetadata {
    /// HTTP-equivalent status code
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DOCUMENT_LOCKED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// One field-level difference between a search projection and its relational record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub field: String,
    pub message: String,
}

impl Divergence {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Standard "{field} not equal" divergence with both rendered values.
    pub fn not_equal(field: &str, search: impl fmt::Debug, db: impl fmt::Debug) -> Self {
        Self::new(
            field,
            format!("{} not equal, search={:?}, db={:?}", field, search, db),
        )
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every divergence found by a single consistency check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    divergences: Vec<Divergence>,
}

impl ConsistencyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, divergence: Divergence) {
        self.divergences.push(divergence);
    }

    pub fn extend(&mut self, other: ConsistencyReport) {
        self.divergences.extend(other.divergences);
    }

    pub fn is_empty(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.divergences.len()
    }

    pub fn divergences(&self) -> &[Divergence] {
        &self.divergences
    }

    /// Names of the fields that diverged, in detection order.
    pub fn fields(&self) -> Vec<&str> {
        self.divergences.iter().map(|d| d.field.as_str()).collect()
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.divergences.iter().any(|d| d.field == field)
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_error_list(f, self.divergences.iter())
    }
}

/// A compensating action of the publication workflow that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub step: String,
    pub error: String,
}

impl fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Failures collected while unwinding a partially applied publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationFailures {
    failures: Vec<CompensationFailure>,
}

impl CompensationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: impl Into<String>, error: impl fmt::Display) {
        self.failures.push(CompensationFailure {
            step: step.into(),
            error: error.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[CompensationFailure] {
        &self.failures
    }
}

impl fmt::Display for CompensationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_error_list(f, self.failures.iter())
    }
}

fn write_error_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl ExactSizeIterator<Item = T>,
) -> fmt::Result {
    let count = items.len();
    if count == 1 {
        write!(f, "1 error occurred:")?;
    } else {
        write!(f, "{} errors occurred:", count)?;
    }
    for item in items {
        write!(f, "\n\t* {}", item)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage provider error: {0}")]
    Storage(String),

    #[error("Search index error: {0}")]
    Search(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Document is locked: {0}")]
    Locked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document consistency check failed: {0}")]
    Inconsistent(ConsistencyReport),

    #[error("Publication failed: {source}")]
    PublicationFailed {
        #[source]
        source: Box<AppError>,
        compensation: CompensationFailures,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => (502, "STORAGE_PROVIDER_ERROR", true, LogLevel::Error),
        AppError::Search(_) => (502, "SEARCH_INDEX_ERROR", true, LogLevel::Error),
        AppError::Validation(_) => (400, "VALIDATION_FAILED", false, LogLevel::Debug),
        AppError::Locked(_) => (423, "DOCUMENT_LOCKED", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::Inconsistent(_) => (500, "DOCUMENT_INCONSISTENT", false, LogLevel::Warn),
        AppError::PublicationFailed { .. } => (500, "PUBLICATION_FAILED", true, LogLevel::Error),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        if let AppError::PublicationFailed { compensation, .. } = self {
            if !compensation.is_empty() {
                details.push_str(&format!("\n  Compensation: {}", compensation));
            }
        }

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access document storage".to_string(),
            AppError::Search(_) => "Failed to access search index".to_string(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Locked(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Inconsistent(_) => "Document data is inconsistent".to_string(),
            AppError::PublicationFailed { .. } => "Failed to publish document".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
