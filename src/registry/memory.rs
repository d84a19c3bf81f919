use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::MappingRegistry;
use crate::{ContentId, FsError, MessageId, Result};

#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<HashMap<ContentId, MessageId>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl MappingRegistry for MemoryRegistry {
    async fn save(&self, content_id: &ContentId, message_id: MessageId) -> Result<()> {
        self.entries.lock().await.insert(content_id.clone(), message_id);
        Ok(())
    }

    async fn remove(&self, content_id: &ContentId) -> Result<()> {
        self.entries.lock().await.remove(content_id);
        Ok(())
    }

    async fn find(&self, content_id: &ContentId) -> Result<MessageId> {
        self.entries
            .lock()
            .await
            .get(content_id)
            .copied()
            .ok_or_else(|| FsError::NotFound(format!("mapping for {}", content_id)))
    }
}
