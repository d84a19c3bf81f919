//! Filesystem callbacks translated into catalog and content-store calls.
//!
//! The host runtime drives [`DirectoryOps`] and [`FileOps`] concurrently.
//! Catalog locks are only held inside individual catalog calls, so uploads
//! and downloads never block unrelated metadata operations.

mod dir;
mod file;

pub use dir::DirNode;
pub use file::{slice_range, FileNode};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, MemoryCatalog, SqlCatalog};
use crate::config::{CatalogKind, Config, RegistryKind};
use crate::db::Database;
use crate::registry::{JournalRegistry, MappingRegistry, MemoryRegistry, SqlRegistry};
use crate::store::{ContentStore, LocalStore};
use crate::{Attr, ContentClient, FileRecord, FsError, Inode, Result, Tag, ROOT_INODE};

/// Directory node callbacks.
#[async_trait]
pub trait DirectoryOps: Send + Sync {
    async fn attr(&self) -> Attr;
    async fn lookup(&self, name: &str) -> Result<FileNode>;
    async fn read_dir_all(&self) -> Result<Vec<FileRecord>>;
    async fn create(&self, request: CreateRequest) -> Result<FileNode>;
    /// Removes one file, or a whole tag group when `name` is `#<tag>`.
    async fn remove(&self, name: &str) -> Result<()>;
}

/// File node callbacks.
#[async_trait]
pub trait FileOps: Send + Sync {
    async fn attr(&self) -> Result<Attr>;
    /// Returns at most `size` bytes starting at `offset`; short and empty
    /// reads are not errors.
    async fn read(&self, offset: u64, size: usize) -> Result<Vec<u8>>;
    /// Replaces the whole object with `data` and returns the bytes written.
    async fn write(&self, data: &[u8]) -> Result<usize>;
}

/// Hook into the runtime's directory-entry cache.
pub trait EntryInvalidator: Send + Sync {
    fn invalidate_entry(&self, parent: Inode, name: &str);
}

pub struct NoopInvalidator;

impl EntryInvalidator for NoopInvalidator {
    fn invalidate_entry(&self, _parent: Inode, _name: &str) {}
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            name: name.into(),
            mode,
            uid,
            gid,
        }
    }
}

struct Shared {
    catalog: Arc<dyn Catalog>,
    content: ContentClient,
    invalidator: Arc<dyn EntryInvalidator>,
}

#[derive(Clone)]
pub struct FileSystem {
    shared: Arc<Shared>,
}

impl FileSystem {
    pub fn new(catalog: Arc<dyn Catalog>, content: ContentClient) -> Self {
        Self {
            shared: Arc::new(Shared {
                catalog,
                content,
                invalidator: Arc::new(NoopInvalidator),
            }),
        }
    }

    pub fn with_invalidator(self, invalidator: Arc<dyn EntryInvalidator>) -> Self {
        Self {
            shared: Arc::new(Shared {
                catalog: Arc::clone(&self.shared.catalog),
                content: self.shared.content.clone(),
                invalidator,
            }),
        }
    }

    /// Builds the catalog, registry and local store named by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let db = match (&config.database, config.needs_database()) {
            (Some(path), true) => Some(Database::open(path)?),
            _ => None,
        };
        let database = || {
            db.clone()
                .ok_or_else(|| FsError::Config("no database configured".to_string()))
        };

        let catalog: Arc<dyn Catalog> = match config.catalog {
            CatalogKind::Memory => Arc::new(MemoryCatalog::new()),
            CatalogKind::Sqlite => Arc::new(SqlCatalog::new(database()?)),
        };
        let registry: Arc<dyn MappingRegistry> = match config.registry {
            RegistryKind::Memory => Arc::new(MemoryRegistry::new()),
            RegistryKind::Journal => Arc::new(JournalRegistry::open(&config.journal).await?),
            RegistryKind::Sqlite => Arc::new(SqlRegistry::new(database()?)),
        };
        let store: Arc<dyn ContentStore> = Arc::new(
            LocalStore::new(&config.store.path)
                .await?
                .with_compression(config.store.compression)
                .with_chunk_size(config.store.chunk_size),
        );

        info!(catalog = ?config.catalog, registry = ?config.registry, store = %config.store.path.display(), "filesystem assembled");
        Ok(Self::new(catalog, ContentClient::new(store, registry)))
    }

    pub fn root(&self) -> DirNode {
        DirNode::new(self.clone(), ROOT_INODE)
    }

    pub fn content(&self) -> &ContentClient {
        &self.shared.content
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.shared.catalog
    }

    /// Removes every record carrying `tag` and returns how many went.
    ///
    /// Not transactional: a failing record is skipped, the rest are still
    /// attempted, and the first error is reported.
    pub async fn delete_tag_group(&self, tag: &Tag) -> Result<usize> {
        let records = self.shared.catalog.find_by_tag(tag).await?;
        if records.is_empty() {
            return Err(FsError::NotFound(tag.caption()));
        }

        let mut removed = 0;
        let mut first_error = None;
        for record in &records {
            match self.remove_record(record).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(%tag, name = %record.name, error = %e, "tag group member not removed");
                    first_error.get_or_insert(e);
                }
            }
        }
        info!(%tag, removed, total = records.len(), "tag group deleted");

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Content delete, mapping removal, catalog removal, then invalidation.
    async fn remove_record(&self, record: &FileRecord) -> Result<()> {
        if let Some(content_id) = &record.content_id {
            match self.shared.content.delete(content_id).await {
                Ok(()) => {}
                // An earlier remove got this far before the catalog step failed.
                Err(e) if e.is_not_found() => {
                    debug!(%content_id, "content already deleted, removing record");
                }
                Err(e) => return Err(e),
            }
        }

        let removed = self.shared.catalog.remove(record.inode).await?;
        // A write that landed between the two steps left newer content behind.
        if let Some(newer) = removed.content_id.filter(|id| Some(id) != record.content_id.as_ref()) {
            if let Err(e) = self.shared.content.delete(&newer).await {
                warn!(content_id = %newer, error = %e, "failed to delete content of removed file");
            }
        }

        self.shared.invalidator.invalidate_entry(record.parent, &record.name);
        info!(inode = %record.inode, name = %record.name, "file removed");
        Ok(())
    }
}
