use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage quota exceeded: writing {key} needs {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
}

/// Session-scoped string key/value storage.
///
/// Entries survive for as long as the session that owns the store, so a
/// registry rebuilt against the same store sees what the previous one wrote.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
struct MemoryEntries {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryEntries {
    fn used_bytes(&self) -> usize {
        self.items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

// In-memory session store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<MemoryEntries>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys plus values would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.set_quota(Some(bytes));
        store
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.lock().expect("session store mutex").quota = bytes;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session store mutex").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let entries = self.inner.lock().expect("session store mutex");
        Ok(entries.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.inner.lock().expect("session store mutex");

        if let Some(quota) = entries.quota {
            // The entry being replaced frees its own space
            let replaced = entries
                .items
                .get(key)
                .map_or(0, |old| key.len() + old.len());
            let available = quota.saturating_sub(entries.used_bytes() - replaced);
            let needed = key.len() + value.len();
            if needed > available {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                }
                .into());
            }
        }

        entries.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = self.inner.lock().expect("session store mutex");
        entries.items.remove(key);
        Ok(())
    }
}
