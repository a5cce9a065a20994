use std::fmt;

use uuid::Uuid;

/// Target-side document id. Ids minted here are UUID v4 strings; ids observed
/// on the target (the root folder, pre-existing documents) are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId(String);

impl StableId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hyphenated 8-4-4-4-12 hex form only.
    pub fn has_uuid_shape(value: &str) -> bool {
        value.len() == 36 && Uuid::try_parse(value).is_ok()
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StableId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Document,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDocEntry {
    pub id: StableId,
    pub doc_type: DocType,
    pub parent: StableId,
    pub visible_name: String,
    pub version: u32,
    pub source_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Pending,
    SlotRejected(String),
    Transferred,
    Failed(String),
}

/// An entry the diff step decided to push, carrying its next version in
/// `entry.version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub entry: TargetDocEntry,
    pub outcome: UploadOutcome,
}

impl UploadCandidate {
    pub fn new(entry: TargetDocEntry) -> Self {
        Self {
            entry,
            outcome: UploadOutcome::Pending,
        }
    }
}
