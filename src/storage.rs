// Persisted last structure. One named slot, JSON, restored on startup and
// written through on every successful structure load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::types::Structure;

/// Slot holding the last successfully loaded structure.
pub const LAST_STRUCTURE_KEY: &str = "lastStructure";

/// String key/value store that outlives a session.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError>;
}

/// In-process store, for native hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new() -> Result<Self, EngineError> {
        let window = web_sys::window().ok_or_else(|| EngineError::Storage("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| EngineError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| EngineError::Storage("localStorage unavailable".to_string()))?;
        Ok(LocalStorageStore { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        self.storage
            .get_item(key)
            .map_err(|e| EngineError::Storage(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| EngineError::Storage(format!("{:?}", e)))
    }
}

#[derive(Serialize, Deserialize)]
struct Slot<T> {
    value: T,
}

/// Typed access to the persisted slots.
pub struct PersistedState<K> {
    store: K,
}

impl<K: KeyValueStore> PersistedState<K> {
    pub fn new(store: K) -> Self {
        PersistedState { store }
    }

    /// The last structure, if one was saved. A slot that cannot be read or
    /// decoded is treated as empty.
    pub fn load_structure(&self) -> Option<Structure> {
        let raw = match self.store.get(LAST_STRUCTURE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read persisted structure");
                return None;
            }
        };

        match serde_json::from_str::<Slot<Structure>>(&raw) {
            Ok(slot) => {
                debug!(filename = %slot.value.filename, "persisted structure found");
                Some(slot.value)
            }
            Err(e) => {
                warn!(error = %e, "persisted structure is corrupt, ignoring");
                None
            }
        }
    }

    pub fn save_structure(&mut self, structure: &Structure) -> Result<(), EngineError> {
        let raw = serde_json::to_string(&Slot { value: structure })?;
        self.store.set(LAST_STRUCTURE_KEY, &raw)
    }

    pub fn store(&self) -> &K {
        &self.store
    }
}
