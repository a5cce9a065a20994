mod local;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown source id: {0}")]
    UnknownId(String),
    #[error("shortcut {0} does not resolve to a file or folder")]
    BrokenShortcut(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Folder,
    Shortcut,
}

/// One node observed while walking the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub source_id: String,
    pub name: String,
    pub kind: SourceKind,
    pub size_bytes: Option<u64>,
    pub parent_source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub kind: SourceKind,
}

/// Read-only view of the storage system being synced from.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Finds a folder by native id first, then by name search.
    async fn find_folder(&self, locator: &str) -> Result<Option<SourceItem>, SourceError>;

    /// Files directly inside `folder`, shortcuts included.
    async fn list_files(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError>;

    async fn list_subfolders(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError>;

    /// Follows a shortcut to the node it points at. Non-shortcuts come back as-is.
    async fn resolve_shortcut(&self, item: SourceItem) -> Result<SourceItem, SourceError>;

    async fn content_bytes(&self, source_id: &str) -> Result<Vec<u8>, SourceError>;

    async fn metadata(&self, source_id: &str) -> Result<SourceMetadata, SourceError>;
}
