use tracing::warn;

use super::model::{DocType, TargetDocEntry};
use super::remote_index::RemoteDocumentIndex;

/// Largest document the target accepts for a first upload (50 MiB).
pub const MAX_NEW_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 2] = [".pdf", ".epub"];

/// Caller-supplied override: `(candidate, observed)` returning true forces a
/// version bump even when name and parent are unchanged.
pub type ForceUpdate = Box<dyn Fn(&TargetDocEntry, &TargetDocEntry) -> bool + Send + Sync>;

pub struct DiffEngine<'a> {
    observed: &'a RemoteDocumentIndex,
    force_update: Option<&'a ForceUpdate>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(observed: &'a RemoteDocumentIndex, force_update: Option<&'a ForceUpdate>) -> Self {
        Self {
            observed,
            force_update,
        }
    }

    /// Decides whether `candidate` must be pushed. When it must and the id is
    /// already known, `candidate.version` is set to the observed version + 1.
    /// An observed version at `u32::MAX` cannot be bumped and is left alone.
    pub fn needs_update(&self, candidate: &mut TargetDocEntry) -> bool {
        let Some(observed) = self.observed.get(&candidate.id) else {
            return accepts_new(candidate);
        };

        let forced = self
            .force_update
            .is_some_and(|force| force(&*candidate, observed));
        let changed =
            observed.parent != candidate.parent || observed.visible_name != candidate.visible_name;
        if !forced && !changed {
            return false;
        }

        match observed.version.checked_add(1) {
            Some(next) => {
                candidate.version = next;
                true
            }
            None => {
                warn!(
                    id = %candidate.id,
                    version = observed.version,
                    "target version cannot be bumped further, skipping"
                );
                false
            }
        }
    }
}

fn accepts_new(candidate: &TargetDocEntry) -> bool {
    match candidate.doc_type {
        DocType::Collection => true,
        DocType::Document => {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|ext| candidate.visible_name.ends_with(ext))
                && candidate.source_size_bytes.unwrap_or(0) <= MAX_NEW_DOCUMENT_BYTES
        }
    }
}
