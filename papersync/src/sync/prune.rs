use std::collections::HashSet;

use papersync_cloud::CloudError;
use tracing::{info, warn};

use super::model::{StableId, TargetDocEntry};
use super::remote_index::RemoteDocumentIndex;
use super::target::TargetStore;

/// Everything reachable below `root` through parent pointers, `root` excluded.
pub fn descendants_of(index: &RemoteDocumentIndex, root: &StableId) -> HashSet<StableId> {
    let mut found = HashSet::new();
    let mut pending = vec![root.clone()];
    while let Some(parent) = pending.pop() {
        for child in index.children_of(&parent) {
            if child.id == *root || !found.insert(child.id.clone()) {
                warn!(id = %child.id, parent = %parent, "cycle in target parent pointers");
                continue;
            }
            pending.push(child.id.clone());
        }
    }
    found
}

pub struct MirrorPruner<'a> {
    index: &'a RemoteDocumentIndex,
    root: &'a StableId,
}

impl<'a> MirrorPruner<'a> {
    pub fn new(index: &'a RemoteDocumentIndex, root: &'a StableId) -> Self {
        Self { index, root }
    }

    /// Observed entries under the root that the source no longer has.
    /// `protected` roots and their subtrees survive.
    pub fn deletion_set(
        &self,
        candidates: &[TargetDocEntry],
        protected: &[StableId],
    ) -> Vec<TargetDocEntry> {
        let mut keep: HashSet<&StableId> = candidates.iter().map(|c| &c.id).collect();
        let shielded: HashSet<StableId> = protected
            .iter()
            .flat_map(|id| {
                let mut subtree = descendants_of(self.index, id);
                subtree.insert(id.clone());
                subtree
            })
            .collect();
        keep.extend(shielded.iter());

        let mut doomed: Vec<TargetDocEntry> = descendants_of(self.index, self.root)
            .iter()
            .filter(|id| !keep.contains(id))
            .filter_map(|id| self.index.get(id).cloned())
            .collect();
        doomed.sort_by(|a, b| a.id.cmp(&b.id));
        doomed
    }

    pub async fn prune(
        &self,
        target: &dyn TargetStore,
        candidates: &[TargetDocEntry],
        protected: &[StableId],
    ) -> Result<usize, CloudError> {
        let doomed = self.deletion_set(candidates, protected);
        if doomed.is_empty() {
            return Ok(0);
        }
        for entry in &doomed {
            info!(id = %entry.id, name = %entry.visible_name, "deleting from target");
        }
        target.delete_documents(&doomed).await?;
        Ok(doomed.len())
    }
}
