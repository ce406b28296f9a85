use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::REFRESH_HEADERS_KEY_PREFIX;

/// Per-folder watermark: everything modified before `last_indexed_at` has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IndexerFolder {
    pub google_drive_id: String,
    pub last_indexed_at: DateTime<Utc>,
}

/// Singleton row recording when the last complete indexer run started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IndexerMetadata {
    pub last_full_index_at: DateTime<Utc>,
}

/// The two watched folders a document can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderKind {
    Drafts,
    Documents,
}

impl Display for FolderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FolderKind::Drafts => write!(f, "drafts"),
            FolderKind::Documents => write!(f, "documents"),
        }
    }
}

/// Watermark key of the header-refresh pass for a folder.
pub fn refresh_headers_key(folder_id: &str) -> String {
    format!("{}{}", REFRESH_HEADERS_KEY_PREFIX, folder_id)
}
