use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::model::StableId;
use crate::storage::{PropertyStore, StoreError};

pub const DEVICE_TOKEN_KEY: &str = "__DEVICE_TOKEN__";
pub const DEVICE_ID_KEY: &str = "__DEVICE_ID__";
const RESERVED_KEYS: [&str; 2] = [DEVICE_TOKEN_KEY, DEVICE_ID_KEY];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("property store error: {0}")]
    Store(#[from] StoreError),
    #[error("source id {0:?} is a reserved key")]
    ReservedKey(String),
    #[error("stable id {stable_id} already belongs to {owner:?}")]
    StableIdTaken { stable_id: StableId, owner: String },
    #[error("source id {source_id:?} is already mapped to {current}")]
    SourceRemapped { source_id: String, current: StableId },
}

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Bijective map between source ids and stable ids. Every insert checks both
/// directions, so the inverse can never drift from the forward map.
#[derive(Debug, Default, Clone)]
pub struct StableIdMap {
    forward: HashMap<String, StableId>,
    inverse: HashMap<StableId, String>,
}

impl StableIdMap {
    pub fn insert(&mut self, source_id: &str, stable_id: StableId) -> Result<(), RegistryError> {
        if let Some(existing) = self.inverse.get(&stable_id)
            && existing != source_id
        {
            return Err(RegistryError::StableIdTaken {
                stable_id,
                owner: existing.clone(),
            });
        }
        if let Some(current) = self.forward.get(source_id)
            && *current != stable_id
        {
            return Err(RegistryError::SourceRemapped {
                source_id: source_id.to_string(),
                current: current.clone(),
            });
        }
        self.forward.insert(source_id.to_string(), stable_id.clone());
        self.inverse.insert(stable_id, source_id.to_string());
        Ok(())
    }

    pub fn stable_id(&self, source_id: &str) -> Option<&StableId> {
        self.forward.get(source_id)
    }

    pub fn source_id(&self, stable_id: &StableId) -> Option<&str> {
        self.inverse.get(stable_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StableId)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v))
    }
}

pub struct IdentifierRegistry {
    store: Arc<dyn PropertyStore>,
    map: StableIdMap,
    dirty: bool,
}

impl IdentifierRegistry {
    /// Loads the full mapping eagerly. Credential keys sharing the namespace are
    /// left out of the working copy.
    pub async fn load(store: Arc<dyn PropertyStore>) -> Result<Self, RegistryError> {
        let mut map = StableIdMap::default();
        for (source_id, stable_id) in store.load_all().await? {
            if is_reserved_key(&source_id) {
                continue;
            }
            map.insert(&source_id, StableId::new(stable_id))?;
        }
        debug!(entries = map.len(), "identifier registry loaded");
        Ok(Self {
            store,
            map,
            dirty: false,
        })
    }

    pub fn get_or_create(&mut self, source_id: &str) -> Result<StableId, RegistryError> {
        if let Some(existing) = self.map.stable_id(source_id) {
            return Ok(existing.clone());
        }
        if is_reserved_key(source_id) {
            return Err(RegistryError::ReservedKey(source_id.to_string()));
        }
        let stable_id = StableId::mint();
        self.map.insert(source_id, stable_id.clone())?;
        self.dirty = true;
        Ok(stable_id)
    }

    pub fn lookup(&self, source_id: &str) -> Option<&StableId> {
        self.map.stable_id(source_id)
    }

    pub fn source_id_of(&self, stable_id: &StableId) -> Option<&str> {
        self.map.source_id(stable_id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Writes the whole forward map, overwriting stored values. Safe to repeat.
    pub async fn persist(&mut self) -> Result<(), RegistryError> {
        let entries: Vec<(String, String)> = self
            .map
            .iter()
            .map(|(source_id, stable_id)| (source_id.to_string(), stable_id.to_string()))
            .collect();
        self.store.put_all(&entries).await?;
        self.dirty = false;
        Ok(())
    }
}
