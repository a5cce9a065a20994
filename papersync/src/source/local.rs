use std::collections::{HashMap, VecDeque};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::paths::expand_home;
use super::{SourceError, SourceItem, SourceKind, SourceMetadata, SourceStore};

const SEARCH_MAX_DEPTH: usize = 4;

/// Local directory tree as a sync source. Symlinks act as shortcuts.
///
/// On Unix a node's native id is its device and inode pair, so renames and
/// moves inside the tree keep the id. Ids are only resolvable after the node
/// was seen through `find_folder` or a listing in the same process.
pub struct LocalSource {
    search_root: PathBuf,
    known: Mutex<HashMap<String, PathBuf>>,
}

impl LocalSource {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Self {
            search_root: search_root.into(),
            known: Mutex::new(HashMap::new()),
        }
    }

    async fn describe(
        &self,
        path: &Path,
        parent_source_id: Option<String>,
    ) -> Result<SourceItem, SourceError> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        let kind = kind_of(&meta);
        let source_id = native_id(path, &meta);
        self.known
            .lock()
            .await
            .insert(source_id.clone(), path.to_path_buf());
        Ok(SourceItem {
            source_id,
            name: file_name(path),
            kind,
            size_bytes: (kind == SourceKind::File).then_some(meta.len()),
            parent_source_id,
        })
    }

    async fn path_of(&self, source_id: &str) -> Result<PathBuf, SourceError> {
        self.known
            .lock()
            .await
            .get(source_id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownId(source_id.to_string()))
    }

    async fn list_entries(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError> {
        let dir = self.path_of(&folder.source_id).await?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            out.push(
                self.describe(&entry.path(), Some(folder.source_id.clone()))
                    .await?,
            );
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn search_by_name(&self, name: &str) -> Result<Option<PathBuf>, SourceError> {
        let mut queue = VecDeque::from([(self.search_root.clone(), 0usize)]);
        while let Some((dir, depth)) = queue.pop_front() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    children.push(entry.path());
                }
            }
            children.sort();
            for child in children {
                if file_name(&child) == name {
                    return Ok(Some(child));
                }
                if depth + 1 < SEARCH_MAX_DEPTH {
                    queue.push_back((child, depth + 1));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl SourceStore for LocalSource {
    async fn find_folder(&self, locator: &str) -> Result<Option<SourceItem>, SourceError> {
        let direct = Some(locator)
            .filter(|locator| !locator.is_empty())
            .map(|locator| self.search_root.join(expand_home(locator)))
            .filter(|path| path.is_dir());
        let found = match direct {
            Some(path) => Some(path),
            None => self.search_by_name(locator).await?,
        };
        let Some(path) = found else {
            return Ok(None);
        };
        let path = tokio::fs::canonicalize(&path).await?;
        Ok(Some(self.describe(&path, None).await?))
    }

    async fn list_files(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError> {
        let entries = self.list_entries(folder).await?;
        Ok(entries
            .into_iter()
            .filter(|item| matches!(item.kind, SourceKind::File | SourceKind::Shortcut))
            .collect())
    }

    async fn list_subfolders(&self, folder: &SourceItem) -> Result<Vec<SourceItem>, SourceError> {
        let entries = self.list_entries(folder).await?;
        Ok(entries
            .into_iter()
            .filter(|item| item.kind == SourceKind::Folder)
            .collect())
    }

    async fn resolve_shortcut(&self, item: SourceItem) -> Result<SourceItem, SourceError> {
        if item.kind != SourceKind::Shortcut {
            return Ok(item);
        }
        let link = self.path_of(&item.source_id).await?;
        let target = tokio::fs::canonicalize(&link)
            .await
            .map_err(|_| SourceError::BrokenShortcut(item.source_id.clone()))?;
        self.describe(&target, item.parent_source_id).await
    }

    async fn content_bytes(&self, source_id: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.path_of(source_id).await?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn metadata(&self, source_id: &str) -> Result<SourceMetadata, SourceError> {
        let path = self.path_of(source_id).await?;
        let meta = tokio::fs::symlink_metadata(&path).await?;
        let kind = kind_of(&meta);
        let name = file_name(&path);
        Ok(SourceMetadata {
            mime_type: guess_mime_type(&name, kind).to_string(),
            name,
            size_bytes: meta.len(),
            kind,
        })
    }
}

fn kind_of(meta: &Metadata) -> SourceKind {
    if meta.file_type().is_symlink() {
        SourceKind::Shortcut
    } else if meta.is_dir() {
        SourceKind::Folder
    } else {
        SourceKind::File
    }
}

#[cfg(unix)]
fn native_id(_path: &Path, meta: &Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{:x}-{:x}", meta.dev(), meta.ino())
}

#[cfg(not(unix))]
fn native_id(path: &Path, _meta: &Metadata) -> String {
    path.to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn guess_mime_type(name: &str, kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Folder => return "inode/directory",
        SourceKind::Shortcut => return "inode/symlink",
        SourceKind::File => {}
    }
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
