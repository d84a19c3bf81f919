//! Durable content id to message id association.
//!
//! The chat backend addresses uploads by message, so deleting an object
//! means resolving its message id here first.

mod journal;
mod memory;
mod sql;

pub use journal::JournalRegistry;
pub use memory::MemoryRegistry;
pub use sql::SqlRegistry;

use async_trait::async_trait;

use crate::{ContentId, MessageId, Result};

#[async_trait]
pub trait MappingRegistry: Send + Sync {
    /// Upsert; the last write wins.
    async fn save(&self, content_id: &ContentId, message_id: MessageId) -> Result<()>;
    /// Removing an absent entry is not an error.
    async fn remove(&self, content_id: &ContentId) -> Result<()>;
    async fn find(&self, content_id: &ContentId) -> Result<MessageId>;
}
