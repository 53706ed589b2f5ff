//! Client-local durable key-value storage
//!
//! Models the browser-profile storage the portal persists its session
//! snapshot to: synchronous get/set/remove, optional persistence to a
//! JSON file across restarts, and a change event delivered to every
//! other open handle of the same storage. Handles created through
//! [`LocalStorage::new_handle`] stand in for separate tabs; events carry
//! the writing handle's id so a subscriber can skip its own writes, the
//! way browser storage events only fire in other tabs. Delivery is
//! best-effort: a lagging subscriber drops events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{Error, Result};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A change to a storage key. `value` is `None` for removals.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    pub value: Option<String>,
    pub origin: Uuid,
}

struct StorageInner {
    values: Mutex<HashMap<String, String>>,
    path: Option<PathBuf>,
    events: broadcast::Sender<StorageEvent>,
}

/// Handle to a shared key-value store.
///
/// `Clone` keeps the handle id (same tab); [`Self::new_handle`] mints a
/// new id over the same underlying storage (another tab of the same
/// browser profile).
#[derive(Clone)]
pub struct LocalStorage {
    id: Uuid,
    inner: Arc<StorageInner>,
}

impl LocalStorage {
    /// Create an in-memory storage with no file backing.
    pub fn in_memory() -> Self {
        Self::build(HashMap::new(), None)
    }

    /// Open a file-backed storage, loading any existing contents.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|err| Error::Storage(format!("Failed to read local storage: {}", err)))?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content).map_err(|err| {
                    Error::Storage(format!("Failed to parse local storage: {}", err))
                })?
            }
        } else {
            HashMap::new()
        };
        Ok(Self::build(values, Some(path)))
    }

    fn build(values: HashMap<String, String>, path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(StorageInner {
                values: Mutex::new(values),
                path,
                events,
            }),
        }
    }

    /// A handle over the same storage with its own identity, as another
    /// open tab would have.
    pub fn new_handle(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Id identifying this handle in change events.
    pub fn handle_id(&self) -> Uuid {
        self.id
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<String> {
        let values = self.inner.values.lock().ok()?;
        values.get(key).cloned()
    }

    /// Write a value, persist, and notify other handles.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut values = self
                .inner
                .values
                .lock()
                .map_err(|_| Error::Storage("Local storage lock poisoned".to_string()))?;
            values.insert(key.to_string(), value.to_string());
            self.persist(&values)?;
        }
        self.publish(key, Some(value.to_string()));
        Ok(())
    }

    /// Remove a value, persist, and notify other handles.
    pub fn remove(&self, key: &str) -> Result<()> {
        let removed = {
            let mut values = self
                .inner
                .values
                .lock()
                .map_err(|_| Error::Storage("Local storage lock poisoned".to_string()))?;
            let removed = values.remove(key).is_some();
            if removed {
                self.persist(&values)?;
            }
            removed
        };
        if removed {
            self.publish(key, None);
        }
        Ok(())
    }

    /// Subscribe to change events from all handles of this storage.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| Error::Storage(format!("Failed to create storage dir: {}", err)))?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(path, content)
            .map_err(|err| Error::Storage(format!("Failed to write local storage: {}", err)))?;
        Ok(())
    }

    fn publish(&self, key: &str, value: Option<String>) {
        // No subscribers is fine; delivery is best-effort.
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_string(),
            value,
            origin: self.id,
        });
    }
}
