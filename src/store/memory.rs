use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{merge_documents, Document, DocumentStore};
use crate::error::PersistenceError;

/// In-process store. Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, PersistenceError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), PersistenceError> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(key) {
            Some(existing) if merge => merge_documents(existing, document),
            _ => {
                documents.insert(key.to_string(), document);
            }
        }
        Ok(())
    }
}
