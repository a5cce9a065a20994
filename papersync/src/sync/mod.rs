pub mod diff;
mod error;
pub mod model;
pub mod package;
pub mod prune;
pub mod registry;
pub mod remote_index;
pub mod runner;
pub mod target;
pub mod upload;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use diff::ForceUpdate;
pub use error::{ItemError, SyncError};
pub use model::{DocType, StableId, TargetDocEntry, UploadCandidate, UploadOutcome};
pub use runner::{PreparedRun, RunConfig, RunReport, SyncRunner};
pub use target::TargetStore;
