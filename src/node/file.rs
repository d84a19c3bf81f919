use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{FileOps, FileSystem};
use crate::{Attr, FileRecord, Result};

#[derive(Clone)]
pub struct FileNode {
    fs: FileSystem,
    record: FileRecord,
}

impl FileNode {
    pub(super) fn new(fs: FileSystem, record: FileRecord) -> Self {
        Self { fs, record }
    }

    /// The record as it was when this node was resolved.
    pub fn record(&self) -> &FileRecord {
        &self.record
    }
}

/// The part of `data` covered by `[offset, offset + size)`, clamped to its length.
pub fn slice_range(data: &[u8], offset: u64, size: usize) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let end = start.saturating_add(size).min(data.len());
    &data[start..end]
}

#[async_trait]
impl FileOps for FileNode {
    async fn attr(&self) -> Result<Attr> {
        let record = self.fs.shared.catalog.get(self.record.inode).await?;
        Ok(record.attr())
    }

    async fn read(&self, offset: u64, size: usize) -> Result<Vec<u8>> {
        let record = self.fs.shared.catalog.get(self.record.inode).await?;
        let Some(content_id) = record.content_id else {
            return Ok(Vec::new());
        };

        // No ranged fetch exists on the store side.
        let data = self.fs.shared.content.download(&content_id).await?;
        let range = slice_range(&data, offset, size);
        debug!(inode = %record.inode, offset, requested = size, returned = range.len(), "read");
        Ok(range.to_vec())
    }

    async fn write(&self, data: &[u8]) -> Result<usize> {
        let shared = &self.fs.shared;
        let record = shared.catalog.get(self.record.inode).await?;

        let object = shared.content.upload(&record.name, data, &record.tag).await?;
        let previous = match shared
            .catalog
            .commit_content(record.inode, object.content_id.clone(), data.len() as u64)
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                warn!(inode = %record.inode, error = %e, "metadata commit failed, rolling back upload");
                shared.content.rollback(&object).await;
                return Err(e);
            }
        };
        info!(inode = %record.inode, name = %record.name, content_id = %object.content_id, size = data.len(), "write committed");

        if let Some(previous) = previous.filter(|id| *id != object.content_id) {
            if let Err(e) = shared.content.delete(&previous).await {
                warn!(content_id = %previous, error = %e, "failed to retire replaced object");
            }
        }
        Ok(data.len())
    }
}
