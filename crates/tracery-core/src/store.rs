//! Key-value storage port
//!
//! The persisted settings live in the browser's local storage. The engine
//! only ever reads the whole document and writes partial updates, so the
//! port is just those two operations.

use std::cell::RefCell;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::settings::StoredSettings;

/// Error type for storage access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Stored settings are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Flat key-value storage.
#[async_trait(?Send)]
pub trait KeyValueStore {
    /// Read every stored key.
    async fn load(&self) -> Result<Map<String, Value>, StoreError>;

    /// Merge `entries` over the stored document.
    async fn save(&self, entries: Map<String, Value>) -> Result<(), StoreError>;
}

/// Load settings through a store, applying defaults for absent keys.
pub async fn load_settings<S: KeyValueStore + ?Sized>(store: &S) -> Result<StoredSettings, StoreError> {
    let document = store.load().await?;
    Ok(StoredSettings::from_value(Value::Object(document))?)
}

/// In-memory store used by tests and offline tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document. Non-object values start empty.
    pub fn with_document(document: Value) -> Self {
        let entries = match document {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { entries: RefCell::new(entries) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.borrow().clone()
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.snapshot())
    }

    async fn save(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
        self.entries.borrow_mut().extend(entries);
        Ok(())
    }
}
