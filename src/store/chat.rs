use async_trait::async_trait;
use tracing::{debug, info};

use super::{with_retry, ContentStore, RetryConfig};
use crate::{ContentId, MessageId, Result, StoredObject, Tag};

/// What the bot API hands back after a document upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub message_id: MessageId,
    pub file_id: String,
}

/// Wire-level bot API calls. Implementations report transport and auth
/// failures as `StoreUnavailable` and vanished files as `NotFound`.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_document(&self, chat_id: i64, file_name: &str, data: &[u8], caption: &str) -> Result<SentDocument>;
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>>;
    async fn delete_message(&self, chat_id: i64, message_id: MessageId) -> Result<()>;
}

pub struct ChatStore<T> {
    transport: T,
    chat_id: i64,
    retry: RetryConfig,
}

impl<T: ChatTransport> ChatStore<T> {
    pub fn new(transport: T, chat_id: i64) -> Self {
        Self {
            transport,
            chat_id,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: ChatTransport> ContentStore for ChatStore<T> {
    async fn upload(&self, name: &str, data: &[u8], tag: &Tag) -> Result<StoredObject> {
        let caption = tag.caption();
        let sent = with_retry(&self.retry, || {
            self.transport.send_document(self.chat_id, name, data, &caption)
        })
        .await?;
        info!(name, message_id = %sent.message_id, size = data.len(), "document uploaded");
        Ok(StoredObject {
            content_id: ContentId::new(sent.file_id),
            message_id: sent.message_id,
        })
    }

    async fn download(&self, content_id: &ContentId) -> Result<Vec<u8>> {
        let data = with_retry(&self.retry, || self.transport.fetch_file(content_id.as_str())).await?;
        debug!(%content_id, size = data.len(), "document fetched");
        Ok(data)
    }

    async fn delete(&self, object: &StoredObject) -> Result<()> {
        with_retry(&self.retry, || {
            self.transport.delete_message(self.chat_id, object.message_id)
        })
        .await?;
        info!(content_id = %object.content_id, message_id = %object.message_id, "message deleted");
        Ok(())
    }
}
