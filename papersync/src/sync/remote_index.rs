use std::collections::HashMap;

use super::model::{StableId, TargetDocEntry};

/// Snapshot of the target's document tree taken before the run.
#[derive(Debug, Default, Clone)]
pub struct RemoteDocumentIndex {
    entries: Vec<TargetDocEntry>,
    by_id: HashMap<StableId, usize>,
    children: HashMap<StableId, Vec<usize>>,
}

impl RemoteDocumentIndex {
    pub fn new(entries: Vec<TargetDocEntry>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut children: HashMap<StableId, Vec<usize>> = HashMap::new();
        for (ix, entry) in entries.iter().enumerate() {
            by_id.insert(entry.id.clone(), ix);
            children.entry(entry.parent.clone()).or_default().push(ix);
        }
        Self {
            entries,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: &StableId) -> Option<&TargetDocEntry> {
        self.by_id.get(id).map(|ix| &self.entries[*ix])
    }

    pub fn contains(&self, id: &StableId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn children_of<'a>(
        &'a self,
        parent: &StableId,
    ) -> impl Iterator<Item = &'a TargetDocEntry> + 'a {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .map(|ix| &self.entries[*ix])
    }

    /// First entry, in listing order, whose visible name matches.
    pub fn find_by_name(&self, name: &str) -> Option<&TargetDocEntry> {
        self.entries.iter().find(|entry| entry.visible_name == name)
    }

    /// A UUID-shaped locator is taken literally; anything else is looked up by
    /// visible name.
    pub fn resolve_root(&self, locator: &str) -> Option<StableId> {
        if StableId::has_uuid_shape(locator) {
            return Some(StableId::new(locator));
        }
        self.find_by_name(locator).map(|entry| entry.id.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn entry(id: &str, parent: &str, name: &str, version: u32) -> TargetDocEntry {
    use super::model::DocType;
    TargetDocEntry {
        id: StableId::new(id),
        doc_type: if name.contains('.') {
            DocType::Document
        } else {
            DocType::Collection
        },
        parent: StableId::new(parent),
        visible_name: name.to_string(),
        version,
        source_size_bytes: None,
    }
}
