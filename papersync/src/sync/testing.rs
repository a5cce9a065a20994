//! In-memory collaborators for engine tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use papersync_cloud::{CloudError, StatusCode};

use super::model::{StableId, TargetDocEntry, UploadCandidate};
use super::target::{CommitStatus, SlotGrant, TargetStore};
use crate::source::{SourceError, SourceItem, SourceKind, SourceMetadata, SourceStore};

#[derive(Debug, Clone)]
struct FakeNode {
    item: SourceItem,
    points_at: Option<String>,
}

/// Source tree built up front; content of a file is its name's bytes.
#[derive(Debug)]
pub struct FakeSource {
    nodes: Vec<FakeNode>,
    failing: HashSet<String>,
}

impl FakeSource {
    pub fn new(root_id: &str) -> Self {
        let root = SourceItem {
            source_id: root_id.to_string(),
            name: root_id.to_string(),
            kind: SourceKind::Folder,
            size_bytes: None,
            parent_source_id: None,
        };
        Self {
            nodes: vec![FakeNode {
                item: root,
                points_at: None,
            }],
            failing: HashSet::new(),
        }
    }

    fn push(
        mut self,
        parent: &str,
        id: &str,
        name: &str,
        kind: SourceKind,
        size: Option<u64>,
        points_at: Option<&str>,
    ) -> Self {
        self.nodes.push(FakeNode {
            item: SourceItem {
                source_id: id.to_string(),
                name: name.to_string(),
                kind,
                size_bytes: size,
                parent_source_id: Some(parent.to_string()),
            },
            points_at: points_at.map(str::to_string),
        });
        self
    }

    pub fn file(self, parent: &str, id: &str, name: &str, size: u64) -> Self {
        self.push(parent, id, name, SourceKind::File, Some(size), None)
    }

    pub fn folder(self, parent: &str, id: &str, name: &str) -> Self {
        self.push(parent, id, name, SourceKind::Folder, None, None)
    }

    pub fn shortcut(self, parent: &str, id: &str, name: &str, target_id: &str) -> Self {
        self.push(parent, id, name, SourceKind::Shortcut, None, Some(target_id))
    }

    /// Content reads for `id` fail.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn root(&self) -> SourceItem {
        self.nodes[0].item.clone()
    }

    fn node(&self, id: &str) -> Result<&FakeNode, SourceError> {
        self.nodes
            .iter()
            .find(|n| n.item.source_id == id)
            .ok_or_else(|| SourceError::UnknownId(id.to_string()))
    }

    fn children(&self, folder: &SourceItem, kinds: &[SourceKind]) -> Vec<SourceItem> {
        self.nodes
            .iter()
            .filter(|n| n.item.parent_source_id.as_deref() == Some(folder.source_id.as_str()))
            .filter(|n| kinds.contains(&n.item.kind))
            .map(|n| n.item.clone())
            .collect()
    }
}

#[async_trait]
impl SourceStore for FakeSource {
    async fn find_folder(&self, locator: &str) -> Result<Option<SourceItem>, SourceError> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.item.kind == SourceKind::Folder)
            .find(|n| n.item.source_id == locator)
            .or_else(|| {
                self.nodes
                    .iter()
                    .filter(|n| n.item.kind == SourceKind::Folder)
                    .find(|n| n.item.name == locator)
            })
            .map(|n| n.item.clone()))
    }

    async fn list_files(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError> {
        Ok(self.children(folder, &[SourceKind::File, SourceKind::Shortcut]))
    }

    async fn list_subfolders(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError> {
        Ok(self.children(folder, &[SourceKind::Folder]))
    }

    async fn resolve_shortcut(&self, item: SourceItem) -> Result<SourceItem, SourceError> {
        if item.kind != SourceKind::Shortcut {
            return Ok(item);
        }
        let node = self.node(&item.source_id)?;
        let target = node
            .points_at
            .as_deref()
            .ok_or_else(|| SourceError::BrokenShortcut(item.source_id.clone()))?;
        self.node(target)
            .map(|n| n.item.clone())
            .map_err(|_| SourceError::BrokenShortcut(item.source_id.clone()))
    }

    async fn content_bytes(&self, source_id: &str) -> Result<Vec<u8>, SourceError> {
        if self.failing.contains(source_id) {
            return Err(SourceError::Io(std::io::Error::other("read failed")));
        }
        Ok(self.node(source_id)?.item.name.as_bytes().to_vec())
    }

    async fn metadata(&self, source_id: &str) -> Result<SourceMetadata, SourceError> {
        let item = &self.node(source_id)?.item;
        Ok(SourceMetadata {
            name: item.name.clone(),
            size_bytes: item.size_bytes.unwrap_or(0),
            mime_type: "application/octet-stream".to_string(),
            kind: item.kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    Slots(Vec<StableId>),
    Put(StableId),
    Commit(Vec<StableId>),
    Delete(Vec<StableId>),
}

#[derive(Debug, Default)]
pub struct FakeTargetState {
    pub docs: BTreeMap<StableId, TargetDocEntry>,
    pub events: Vec<TargetEvent>,
    pub blobs: BTreeMap<StableId, Vec<u8>>,
    pub reject_slots: HashSet<StableId>,
    pub reject_commits: HashSet<StableId>,
    pub fail_put: HashSet<StableId>,
    pub fail_list: bool,
    pub fail_slots: bool,
    /// Slot requests after this many succeed fail like `fail_slots`.
    pub slot_requests_allowed: Option<usize>,
    pub fail_commit: bool,
    pub fail_delete: bool,
}

/// Target that applies commits and deletes to an in-memory document map.
#[derive(Debug, Default)]
pub struct FakeTarget {
    pub state: Mutex<FakeTargetState>,
}

const BLOB_PREFIX: &str = "https://blob.test/";

fn server_error(what: &str) -> CloudError {
    CloudError::Api {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: format!("{what} unavailable"),
    }
}

impl FakeTarget {
    pub fn with_docs(docs: impl IntoIterator<Item = TargetDocEntry>) -> Self {
        let target = Self::default();
        target.edit(|s| {
            for doc in docs {
                s.docs.insert(doc.id.clone(), doc);
            }
        });
        target
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut FakeTargetState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn events(&self) -> Vec<TargetEvent> {
        self.edit(|s| s.events.clone())
    }

    pub fn doc(&self, id: &StableId) -> Option<TargetDocEntry> {
        self.edit(|s| s.docs.get(id).cloned())
    }

    pub fn doc_named(&self, name: &str) -> Option<TargetDocEntry> {
        self.edit(|s| s.docs.values().find(|d| d.visible_name == name).cloned())
    }

    pub fn doc_count(&self) -> usize {
        self.edit(|s| s.docs.len())
    }

    pub fn mutation_count(&self) -> usize {
        self.edit(|s| s.events.len())
    }
}

#[async_trait]
impl TargetStore for FakeTarget {
    async fn list_all_documents(&self) -> Result<Vec<TargetDocEntry>, CloudError> {
        self.edit(|s| {
            if s.fail_list {
                return Err(server_error("listing"));
            }
            Ok(s.docs.values().cloned().collect())
        })
    }

    async fn request_upload_slots(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<SlotGrant>, CloudError> {
        self.edit(|s| {
            let granted = s
                .events
                .iter()
                .filter(|e| matches!(e, TargetEvent::Slots(_)))
                .count();
            if s.fail_slots || s.slot_requests_allowed.is_some_and(|max| granted >= max) {
                return Err(server_error("upload request"));
            }
            s.events.push(TargetEvent::Slots(
                candidates.iter().map(|c| c.entry.id.clone()).collect(),
            ));
            Ok(candidates
                .iter()
                .map(|c| {
                    let id = c.entry.id.clone();
                    if s.reject_slots.contains(&id) {
                        SlotGrant {
                            id,
                            success: false,
                            upload_url: None,
                            message: "quota exceeded".into(),
                        }
                    } else {
                        SlotGrant {
                            upload_url: Some(format!("{BLOB_PREFIX}{id}")),
                            id,
                            success: true,
                            message: String::new(),
                        }
                    }
                })
                .collect())
        })
    }

    async fn commit_metadata(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<CommitStatus>, CloudError> {
        self.edit(|s| {
            if s.fail_commit {
                return Err(server_error("status update"));
            }
            s.events.push(TargetEvent::Commit(
                candidates.iter().map(|c| c.entry.id.clone()).collect(),
            ));
            Ok(candidates
                .iter()
                .map(|c| {
                    let id = c.entry.id.clone();
                    if s.reject_commits.contains(&id) {
                        return CommitStatus {
                            id,
                            success: false,
                            message: "version conflict".into(),
                        };
                    }
                    let mut doc = c.entry.clone();
                    doc.source_size_bytes = None;
                    s.docs.insert(id.clone(), doc);
                    CommitStatus {
                        id,
                        success: true,
                        message: String::new(),
                    }
                })
                .collect())
        })
    }

    async fn delete_documents(&self, entries: &[TargetDocEntry]) -> Result<(), CloudError> {
        self.edit(|s| {
            if s.fail_delete {
                return Err(server_error("delete"));
            }
            s.events.push(TargetEvent::Delete(
                entries.iter().map(|e| e.id.clone()).collect(),
            ));
            for entry in entries {
                s.docs.remove(&entry.id);
            }
            Ok(())
        })
    }

    async fn put_content(&self, url: &str, blob: Vec<u8>) -> Result<(), CloudError> {
        let id = StableId::new(url.trim_start_matches(BLOB_PREFIX));
        self.edit(|s| {
            if s.fail_put.contains(&id) {
                return Err(server_error("blob storage"));
            }
            s.events.push(TargetEvent::Put(id.clone()));
            s.blobs.insert(id, blob);
            Ok(())
        })
    }
}
