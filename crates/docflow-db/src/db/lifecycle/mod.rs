pub mod document;
pub mod document_type;
pub mod file_revision;
pub mod numbering;
pub mod review;

pub use document::DocumentRepository;
pub use document_type::DocumentTypeRepository;
pub use file_revision::FileRevisionRepository;
pub use numbering::ProductNumberRepository;
pub use review::ReviewRepository;
