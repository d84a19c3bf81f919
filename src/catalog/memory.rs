use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::Catalog;
use crate::{ContentId, FileRecord, FsError, Inode, NewRecord, Result, Tag, ROOT_INODE};

struct CatalogState {
    records: HashMap<Inode, FileRecord>,
    entries: HashMap<(Inode, String), Inode>,
    next_inode: u64,
}

/// Inodes handed out here are not persisted and change across remounts.
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState {
                records: HashMap::new(),
                entries: HashMap::new(),
                next_inode: ROOT_INODE.0 + 1,
            }),
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(inode: Inode) -> FsError {
    FsError::NotFound(format!("inode {}", inode))
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn lookup(&self, parent: Inode, name: &str) -> Result<FileRecord> {
        let state = self.state.lock().await;
        state
            .entries
            .get(&(parent, name.to_string()))
            .and_then(|inode| state.records.get(inode))
            .cloned()
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    async fn get(&self, inode: Inode) -> Result<FileRecord> {
        let state = self.state.lock().await;
        state.records.get(&inode).cloned().ok_or_else(|| not_found(inode))
    }

    async fn list(&self, parent: Inode) -> Result<Vec<FileRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|record| record.parent == parent)
            .cloned()
            .collect())
    }

    async fn create(&self, new: NewRecord) -> Result<FileRecord> {
        let mut state = self.state.lock().await;
        let key = (new.parent, new.name.clone());
        if state.entries.contains_key(&key) {
            return Err(FsError::AlreadyExists(new.name));
        }

        let inode = Inode(state.next_inode);
        state.next_inode += 1;
        let now = Utc::now();
        let record = FileRecord {
            inode,
            parent: new.parent,
            name: new.name,
            tag: new.tag,
            content_id: None,
            size: 0,
            uid: new.uid,
            gid: new.gid,
            mode: new.mode,
            rdev: 0,
            created_at: now,
            modified_at: now,
            accessed_at: now,
        };
        state.entries.insert(key, inode);
        state.records.insert(inode, record.clone());
        debug!(%inode, name = %record.name, "catalog entry created");
        Ok(record)
    }

    async fn commit_content(&self, inode: Inode, content_id: ContentId, size: u64) -> Result<Option<ContentId>> {
        let mut state = self.state.lock().await;
        let record = state.records.get_mut(&inode).ok_or_else(|| not_found(inode))?;
        let previous = record.content_id.replace(content_id);
        record.size = size;
        record.modified_at = Utc::now();
        Ok(previous)
    }

    async fn remove(&self, inode: Inode) -> Result<FileRecord> {
        let mut state = self.state.lock().await;
        let record = state.records.remove(&inode).ok_or_else(|| not_found(inode))?;
        state.entries.remove(&(record.parent, record.name.clone()));
        debug!(%inode, name = %record.name, "catalog entry removed");
        Ok(record)
    }

    async fn find_by_tag(&self, tag: &Tag) -> Result<Vec<FileRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|record| &record.tag == tag)
            .cloned()
            .collect())
    }
}
