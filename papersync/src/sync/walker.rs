use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::error::SyncError;
use super::model::{DocType, StableId, TargetDocEntry};
use super::registry::IdentifierRegistry;
use crate::source::{SourceItem, SourceKind, SourceStore};

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub candidates: Vec<TargetDocEntry>,
    /// Stable ids of skip-listed folders that were synced in an earlier run.
    pub skipped_roots: Vec<StableId>,
}

pub struct SourceTreeWalker<'a> {
    source: &'a dyn SourceStore,
    skip_list: &'a [String],
}

impl<'a> SourceTreeWalker<'a> {
    pub fn new(source: &'a dyn SourceStore, skip_list: &'a [String]) -> Self {
        Self { source, skip_list }
    }

    /// Enumerates everything under `root`. Children of `root` are parented to
    /// `parent`; deeper children to their folder's stable id.
    pub async fn walk(
        &self,
        registry: &mut IdentifierRegistry,
        root: &SourceItem,
        parent: &StableId,
    ) -> Result<WalkOutcome, SyncError> {
        let mut out = WalkOutcome::default();
        let mut emitted: HashSet<StableId> = HashSet::new();
        let mut expanded = HashSet::from([root.source_id.clone()]);
        let mut pending = vec![(root.clone(), parent.clone())];
        // Folders reached through a shortcut expand only after the direct tree.
        let mut linked: VecDeque<(SourceItem, StableId)> = VecDeque::new();

        loop {
            let (folder, children_parent) = if let Some(next) = pending.pop() {
                next
            } else if let Some((folder, next)) = linked.pop_front() {
                if !expanded.insert(folder.source_id.clone()) {
                    warn!(folder = %folder.name, "folder already walked, not descending again");
                    continue;
                }
                (folder, next)
            } else {
                break;
            };
            debug!(folder = %folder.name, "scanning source folder");

            for file in self.source.list_files(&folder).await? {
                let Some(resolved) = self.resolve(&file).await else {
                    continue;
                };
                match resolved.kind {
                    SourceKind::File => {
                        let id = registry.get_or_create(&file.source_id)?;
                        if !emitted.insert(id.clone()) {
                            warn!(name = %file.name, "file already listed under another name, skipping");
                            continue;
                        }
                        out.candidates.push(TargetDocEntry {
                            id,
                            doc_type: DocType::Document,
                            parent: children_parent.clone(),
                            visible_name: file.name.clone(),
                            version: 1,
                            source_size_bytes: resolved.size_bytes,
                        });
                    }
                    SourceKind::Folder => {
                        if let Some(next) = self.enter_folder(
                            registry,
                            &mut out,
                            &mut emitted,
                            &file,
                            &children_parent,
                        )? {
                            linked.push_back((resolved, next));
                        }
                    }
                    SourceKind::Shortcut => {
                        warn!(name = %file.name, "shortcut resolved to another shortcut, skipping");
                    }
                }
            }

            for sub in self.source.list_subfolders(&folder).await? {
                let Some(next) =
                    self.enter_folder(registry, &mut out, &mut emitted, &sub, &children_parent)?
                else {
                    continue;
                };
                if expanded.insert(sub.source_id.clone()) {
                    pending.push((sub, next));
                } else {
                    warn!(folder = %sub.name, "folder already walked, not descending again");
                }
            }
        }

        Ok(out)
    }

    async fn resolve(&self, item: &SourceItem) -> Option<SourceItem> {
        if item.kind != SourceKind::Shortcut {
            return Some(item.clone());
        }
        match self.source.resolve_shortcut(item.clone()).await {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                warn!(name = %item.name, error = %err, "skipping unresolvable shortcut");
                None
            }
        }
    }

    /// Emits the collection for `folder` and returns the id its children hang
    /// off, or `None` when the folder is skip-listed.
    fn enter_folder(
        &self,
        registry: &mut IdentifierRegistry,
        out: &mut WalkOutcome,
        emitted: &mut HashSet<StableId>,
        folder: &SourceItem,
        parent: &StableId,
    ) -> Result<Option<StableId>, SyncError> {
        if self.skip_list.iter().any(|name| *name == folder.name) {
            info!(folder = %folder.name, "skipping source sub folder");
            if let Some(known) = registry.lookup(&folder.source_id) {
                out.skipped_roots.push(known.clone());
            }
            return Ok(None);
        }
        let id = registry.get_or_create(&folder.source_id)?;
        if !emitted.insert(id.clone()) {
            warn!(folder = %folder.name, "folder already listed, skipping");
            return Ok(None);
        }
        out.candidates.push(TargetDocEntry {
            id: id.clone(),
            doc_type: DocType::Collection,
            parent: parent.clone(),
            visible_name: folder.name.clone(),
            version: 1,
            source_size_bytes: None,
        });
        Ok(Some(id))
    }
}
