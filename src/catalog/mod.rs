//! Directory structure and per-file attributes.
//!
//! Two realizations sit behind [`Catalog`]: an in-process arena keyed by
//! synthetic inode ([`MemoryCatalog`]) and a relational one ([`SqlCatalog`]).
//! Both own the uniqueness of `(parent, name)`.

mod memory;
mod sql;

pub use memory::MemoryCatalog;
pub use sql::SqlCatalog;

use async_trait::async_trait;

use crate::{ContentId, FileRecord, Inode, NewRecord, Result, Tag};

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup(&self, parent: Inode, name: &str) -> Result<FileRecord>;
    async fn get(&self, inode: Inode) -> Result<FileRecord>;
    /// Order is whatever the backing store iterates in.
    async fn list(&self, parent: Inode) -> Result<Vec<FileRecord>>;
    async fn create(&self, record: NewRecord) -> Result<FileRecord>;
    /// Points the record at freshly uploaded content and returns the content
    /// id it replaced, if any.
    async fn commit_content(&self, inode: Inode, content_id: ContentId, size: u64) -> Result<Option<ContentId>>;
    async fn remove(&self, inode: Inode) -> Result<FileRecord>;
    async fn find_by_tag(&self, tag: &Tag) -> Result<Vec<FileRecord>>;
}
