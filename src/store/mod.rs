//! Document store abstraction the game session is persisted through.
//!
//! The game only needs two calls: fetch a document by key, and write one
//! (replacing it, or deep-merging into what is already stored). Two backends
//! ship with the crate: [`MemoryStore`] for ephemeral play and tests, and
//! [`JsonFileStore`] which keeps one JSON file per key.

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{PersistenceConfig, StoreBackend};
use crate::error::PersistenceError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// A stored record: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Key-value document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<Document>, PersistenceError>;

    /// Store `document` under `key`. With `merge` the fields are deep-merged
    /// into the existing document; without it the document is replaced.
    async fn put(&self, key: &str, document: Document, merge: bool)
        -> Result<(), PersistenceError>;
}

/// Deep-merge `patch` into `target`. Nested objects are merged field by
/// field, every other value (arrays included) replaces the old one.
pub fn merge_documents(target: &mut Document, patch: Document) {
    for (field, value) in patch {
        match (target.get_mut(&field), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_documents(existing, incoming);
            }
            (_, value) => {
                target.insert(field, value);
            }
        }
    }
}

/// Open the store selected by the persistence config.
pub fn open(config: &PersistenceConfig) -> Arc<dyn DocumentStore> {
    match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(JsonFileStore::new(config.data_dir.clone())),
    }
}
