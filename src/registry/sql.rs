use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::MappingRegistry;
use crate::db::Database;
use crate::{ContentId, FsError, MessageId, Result};

#[derive(Clone)]
pub struct SqlRegistry {
    db: Database,
}

impl SqlRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MappingRegistry for SqlRegistry {
    async fn save(&self, content_id: &ContentId, message_id: MessageId) -> Result<()> {
        let content_id = content_id.clone();
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO message_mapping (content_id, message_id) VALUES (?1, ?2)
                     ON CONFLICT (content_id) DO UPDATE SET message_id = excluded.message_id",
                    params![content_id.as_str(), message_id.0],
                )?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, content_id: &ContentId) -> Result<()> {
        let content_id = content_id.clone();
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "DELETE FROM message_mapping WHERE content_id = ?1",
                    params![content_id.as_str()],
                )?;
                Ok(())
            })
            .await
    }

    async fn find(&self, content_id: &ContentId) -> Result<MessageId> {
        let content_id = content_id.clone();
        self.db
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT message_id FROM message_mapping WHERE content_id = ?1",
                    params![content_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?
                .map(MessageId)
                .ok_or_else(|| FsError::NotFound(format!("mapping for {}", content_id)))
            })
            .await
    }
}
