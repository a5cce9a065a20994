use papersync_cloud::CloudError;
use thiserror::Error;

use super::model::StableId;
use super::registry::RegistryError;
use super::package::PackageError;
use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("target api error: {0}")]
    Target(#[from] CloudError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("identifier registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Failure confined to a single item's content transfer.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("no source item is mapped to {0}")]
    Unmapped(StableId),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("packaging failed: {0}")]
    Package(#[from] PackageError),
    #[error("transfer failed: {0}")]
    Transfer(#[from] CloudError),
}
