/// In-process collection backend
use crate::{
    error::PipelineResult,
    store::{Collection, CollectionBackend},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Memory backend
///
/// Starts empty, so every first read is served from seed data.
#[derive(Default)]
pub struct MemoryBackend {
    documents: RwLock<HashMap<Collection, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn load(&self, collection: Collection) -> PipelineResult<Option<String>> {
        Ok(self.documents.read().await.get(&collection).cloned())
    }

    async fn save(&self, collection: Collection, data: String) -> PipelineResult<()> {
        self.documents.write().await.insert(collection, data);
        Ok(())
    }

    async fn save_all(&self, writes: Vec<(Collection, String)>) -> PipelineResult<()> {
        // One guard for the whole batch so readers never see half of it
        let mut documents = self.documents.write().await;
        for (collection, data) in writes {
            documents.insert(collection, data);
        }
        Ok(())
    }
}
