//! Where file contents actually live.
//!
//! [`ChatStore`] pushes payloads to a chat-bot upload channel through an
//! abstract [`ChatTransport`]; [`LocalStore`] keeps them on local disk.

pub mod chat;
pub mod compression;
pub mod local;
pub mod retry;

pub use chat::{ChatStore, ChatTransport, SentDocument};
pub use local::LocalStore;
pub use retry::{with_retry, RetryConfig};

use async_trait::async_trait;

use crate::{ContentId, Result, StoredObject, Tag};

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn upload(&self, name: &str, data: &[u8], tag: &Tag) -> Result<StoredObject>;
    /// Fails with `NotFound` if the object no longer exists.
    async fn download(&self, content_id: &ContentId) -> Result<Vec<u8>>;
    /// Takes both identifiers: the chat backend deletes by message, the
    /// local backend by content id.
    async fn delete(&self, object: &StoredObject) -> Result<()>;
}
