#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use telefs::catalog::{Catalog, MemoryCatalog};
use telefs::node::EntryInvalidator;
use telefs::registry::{MappingRegistry, MemoryRegistry};
use telefs::store::ContentStore;
use telefs::{
    ContentClient, ContentId, FileRecord, FileSystem, FsError, Inode, MessageId, NewRecord, Result, StoredObject, Tag,
};

/// Content store double that keeps objects in memory.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ContentId, (MessageId, Vec<u8>)>>,
    next_id: AtomicI64,
    fail_uploads: AtomicBool,
    failing_deletes: Mutex<HashSet<ContentId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, content_id: &ContentId) -> bool {
        self.objects.lock().unwrap().contains_key(content_id)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, content_id: &ContentId) {
        self.failing_deletes.lock().unwrap().insert(content_id.clone());
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn upload(&self, _name: &str, data: &[u8], _tag: &Tag) -> Result<StoredObject> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(FsError::StoreUnavailable("upload refused".to_string()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let object = StoredObject {
            content_id: ContentId::new(format!("obj-{}", n)),
            message_id: MessageId(n),
        };
        self.objects
            .lock()
            .unwrap()
            .insert(object.content_id.clone(), (object.message_id, data.to_vec()));
        Ok(object)
    }

    async fn download(&self, content_id: &ContentId) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(content_id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| FsError::NotFound(content_id.to_string()))
    }

    async fn delete(&self, object: &StoredObject) -> Result<()> {
        if self.failing_deletes.lock().unwrap().contains(&object.content_id) {
            return Err(FsError::StoreUnavailable("delete refused".to_string()));
        }
        match self.objects.lock().unwrap().remove(&object.content_id) {
            Some((message_id, _)) if message_id == object.message_id => Ok(()),
            Some(_) => Err(FsError::StoreUnavailable("message id mismatch".to_string())),
            None => Err(FsError::NotFound(object.content_id.to_string())),
        }
    }
}

/// Registry wrapper whose saves can be switched off.
pub struct FlakyRegistry {
    inner: MemoryRegistry,
    fail_saves: AtomicBool,
}

impl FlakyRegistry {
    pub fn new() -> Self {
        Self {
            inner: MemoryRegistry::new(),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl MappingRegistry for FlakyRegistry {
    async fn save(&self, content_id: &ContentId, message_id: MessageId) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(FsError::Persistence("mapping write refused".to_string()));
        }
        self.inner.save(content_id, message_id).await
    }

    async fn remove(&self, content_id: &ContentId) -> Result<()> {
        self.inner.remove(content_id).await
    }

    async fn find(&self, content_id: &ContentId) -> Result<MessageId> {
        self.inner.find(content_id).await
    }
}

/// Catalog wrapper that can refuse commits, refuse the next removal, or
/// slip a write in right before a removal.
pub struct FlakyCatalog {
    inner: MemoryCatalog,
    fail_commits: AtomicBool,
    fail_next_remove: AtomicBool,
    commit_before_remove: Mutex<Option<(ContentId, u64)>>,
}

impl FlakyCatalog {
    pub fn new() -> Self {
        Self {
            inner: MemoryCatalog::new(),
            fail_commits: AtomicBool::new(false),
            fail_next_remove: AtomicBool::new(false),
            commit_before_remove: Mutex::new(None),
        }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_remove(&self) {
        self.fail_next_remove.store(true, Ordering::SeqCst);
    }

    /// The next `remove` first commits `content_id` to the record, as if a
    /// concurrent write finished in between.
    pub fn commit_before_remove(&self, content_id: ContentId, size: u64) {
        *self.commit_before_remove.lock().unwrap() = Some((content_id, size));
    }
}

#[async_trait]
impl Catalog for FlakyCatalog {
    async fn lookup(&self, parent: Inode, name: &str) -> Result<FileRecord> {
        self.inner.lookup(parent, name).await
    }

    async fn get(&self, inode: Inode) -> Result<FileRecord> {
        self.inner.get(inode).await
    }

    async fn list(&self, parent: Inode) -> Result<Vec<FileRecord>> {
        self.inner.list(parent).await
    }

    async fn create(&self, record: NewRecord) -> Result<FileRecord> {
        self.inner.create(record).await
    }

    async fn commit_content(&self, inode: Inode, content_id: ContentId, size: u64) -> Result<Option<ContentId>> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(FsError::Persistence("catalog write refused".to_string()));
        }
        self.inner.commit_content(inode, content_id, size).await
    }

    async fn remove(&self, inode: Inode) -> Result<FileRecord> {
        if self.fail_next_remove.swap(false, Ordering::SeqCst) {
            return Err(FsError::Persistence("catalog delete refused".to_string()));
        }
        let pending = self.commit_before_remove.lock().unwrap().take();
        if let Some((content_id, size)) = pending {
            self.inner.commit_content(inode, content_id, size).await?;
        }
        self.inner.remove(inode).await
    }

    async fn find_by_tag(&self, tag: &Tag) -> Result<Vec<FileRecord>> {
        self.inner.find_by_tag(tag).await
    }
}

#[derive(Default)]
pub struct RecordingInvalidator {
    entries: Mutex<Vec<(Inode, String)>>,
}

impl RecordingInvalidator {
    pub fn invalidated(&self) -> Vec<(Inode, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl EntryInvalidator for RecordingInvalidator {
    fn invalidate_entry(&self, parent: Inode, name: &str) {
        self.entries.lock().unwrap().push((parent, name.to_string()));
    }
}

pub struct Harness {
    pub fs: FileSystem,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<FlakyRegistry>,
    pub catalog: Arc<FlakyCatalog>,
    pub invalidator: Arc<RecordingInvalidator>,
}

/// A filesystem over in-memory doubles for every collaborator.
pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(FlakyRegistry::new());
    let catalog = Arc::new(FlakyCatalog::new());
    let invalidator = Arc::new(RecordingInvalidator::default());
    let content = ContentClient::new(store.clone(), registry.clone());
    let fs = FileSystem::new(catalog.clone(), content).with_invalidator(invalidator.clone());
    Harness {
        fs,
        store,
        registry,
        catalog,
        invalidator,
    }
}
