//! In-memory store for testing and ephemeral runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tootbridge_domain::{Collection, Post, Store, StoreError};

/// In-memory store implementation
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Post>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<Post>>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(collections.get(&collection).cloned())
    }

    async fn write(&self, collection: Collection, posts: Vec<Post>) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        collections.insert(collection, posts);
        Ok(())
    }

    async fn write_batch(&self, batch: Vec<(Collection, Vec<Post>)>) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        for (collection, posts) in batch {
            collections.insert(collection, posts);
        }
        Ok(())
    }
}
