use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::MappingRegistry;
use crate::store::ContentStore;
use crate::{ContentId, Result, StoredObject, Tag};

/// A content store paired with the registry that remembers which message
/// carries each upload.
#[derive(Clone)]
pub struct ContentClient {
    store: Arc<dyn ContentStore>,
    registry: Arc<dyn MappingRegistry>,
}

impl ContentClient {
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<dyn MappingRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &Arc<dyn MappingRegistry> {
        &self.registry
    }

    /// Stores `data` and records its mapping. An object whose mapping could
    /// not be saved is deleted again and never reported.
    pub async fn upload(&self, name: &str, data: &[u8], tag: &Tag) -> Result<StoredObject> {
        let object = self.store.upload(name, data, tag).await?;
        if let Err(e) = self.registry.save(&object.content_id, object.message_id).await {
            warn!(content_id = %object.content_id, error = %e, "mapping save failed, discarding upload");
            self.discard(&object).await;
            return Err(e);
        }
        Ok(object)
    }

    pub async fn download(&self, content_id: &ContentId) -> Result<Vec<u8>> {
        self.store.download(content_id).await
    }

    /// Deletes the object behind `content_id` and forgets its mapping.
    /// Fails with `NotFound` when no mapping exists.
    pub async fn delete(&self, content_id: &ContentId) -> Result<()> {
        let message_id = self.registry.find(content_id).await?;
        let object = StoredObject {
            content_id: content_id.clone(),
            message_id,
        };
        match self.store.delete(&object).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(%content_id, "object already gone from store");
            }
            Err(e) => return Err(e),
        }
        self.registry.remove(content_id).await
    }

    /// Best-effort removal of an object and its mapping after a failed commit.
    pub async fn rollback(&self, object: &StoredObject) {
        if let Err(e) = self.registry.remove(&object.content_id).await {
            warn!(content_id = %object.content_id, error = %e, "failed to drop mapping of rolled back upload");
        }
        self.discard(object).await;
    }

    async fn discard(&self, object: &StoredObject) {
        if let Err(e) = self.store.delete(object).await {
            warn!(content_id = %object.content_id, error = %e, "failed to delete orphaned object");
        }
    }
}
