//! Application-wide constants.

/// Maximum number of bytes of exported document text stored in the search index.
pub const MAX_INDEXED_CONTENT_BYTES: usize = 85_000;

/// The first table of a document is only treated as its header when it starts
/// before this content index. A freshly created document places it at index 2.
pub const HEADER_TABLE_MAX_START_INDEX: i64 = 5;

/// Index at which a missing header table is inserted.
pub const HEADER_TABLE_DEFAULT_START_INDEX: i64 = 2;

/// Prefix of the indexer folder key that stores header-refresh watermarks.
pub const REFRESH_HEADERS_KEY_PREFIX: &str = "refreshHeaders:";

/// Suffix used in place of a document number before one has been allocated.
pub const DOC_NUMBER_PLACEHOLDER: &str = "???";

/// File revision label recorded when a document is submitted for review.
pub const REQUESTED_REVIEW_REVISION_LABEL: &str = "Requested review";

/// Search index collection names.
pub const DRAFTS_COLLECTION: &str = "drafts";
pub const DOCS_COLLECTION: &str = "docs";
pub const LINKS_COLLECTION: &str = "links";
