//! Pass-through store that keeps objects on the local disk.
//!
//! Layout under the base path:
//! - `manifests/<content id>.json`: one [`Manifest`] per object
//! - `chunks/<chunk id>`: raw (optionally gzip-compressed) chunk bytes

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::compression::CompressionManager;
use super::ContentStore;
use crate::chunk::{ChunkId, FileChunker};
use crate::{ContentId, FsError, MessageId, Result, StoredObject, Tag};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub content_id: ContentId,
    pub message_id: MessageId,
    pub name: String,
    pub tag: Tag,
    pub size: u64,
    pub stored_size: u64,
    pub compressed: bool,
    pub checksum: String,
    pub chunk_ids: Vec<ChunkId>,
    pub created_at: DateTime<Utc>,
}

pub struct LocalStore {
    manifests_path: PathBuf,
    chunks_path: PathBuf,
    chunker: FileChunker,
    compression: CompressionManager,
    next_message_id: AtomicI64,
}

impl LocalStore {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_owned();
        let manifests_path = base_path.join("manifests");
        let chunks_path = base_path.join("chunks");

        fs::create_dir_all(&manifests_path).await?;
        fs::create_dir_all(&chunks_path).await?;

        let store = Self {
            manifests_path,
            chunks_path,
            chunker: FileChunker::default(),
            compression: CompressionManager::new(false),
            next_message_id: AtomicI64::new(1),
        };
        let last = store
            .list_manifests()
            .await?
            .iter()
            .map(|m| m.message_id.0)
            .max()
            .unwrap_or(0);
        store.next_message_id.store(last + 1, Ordering::SeqCst);
        debug!(path = %base_path.display(), next_message_id = last + 1, "local store opened");
        Ok(store)
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = CompressionManager::new(enabled);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunker = FileChunker::new(chunk_size);
        self
    }

    pub async fn list_manifests(&self) -> Result<Vec<Manifest>> {
        let mut manifests = Vec::new();
        let mut entries = fs::read_dir(&self.manifests_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path).await?;
                match serde_json::from_str(&content) {
                    Ok(manifest) => manifests.push(manifest),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable manifest"),
                }
            }
        }
        Ok(manifests)
    }

    fn manifest_path(&self, content_id: &ContentId) -> PathBuf {
        self.manifests_path.join(format!("{}.json", content_id))
    }

    fn chunk_path(&self, chunk_id: &ChunkId) -> PathBuf {
        self.chunks_path.join(chunk_id.0.to_string())
    }

    /// Writes to a temporary file and renames it into place, so a manifest
    /// is either complete or absent.
    async fn write_manifest(&self, content_id: &ContentId, json: &[u8]) -> std::io::Result<()> {
        let path = self.manifest_path(content_id);
        let tmp_path = path.with_extension("json.tmp");
        let result = async {
            let mut tmp = fs::File::create(&tmp_path).await?;
            tmp.write_all(json).await?;
            tmp.sync_all().await?;
            drop(tmp);
            fs::rename(&tmp_path, &path).await
        }
        .await;
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }

    async fn read_manifest(&self, content_id: &ContentId) -> Result<Manifest> {
        // Ids are minted here as UUIDs; anything else cannot name a manifest.
        if Uuid::parse_str(content_id.as_str()).is_err() {
            return Err(FsError::NotFound(content_id.to_string()));
        }
        match fs::read_to_string(self.manifest_path(content_id)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FsError::NotFound(content_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_chunks(&self, chunk_ids: &[ChunkId]) {
        for chunk_id in chunk_ids {
            if let Err(e) = fs::remove_file(self.chunk_path(chunk_id)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(chunk = %chunk_id.0, error = %e, "failed to delete chunk");
                }
            }
        }
    }

    fn calculate_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn upload(&self, name: &str, data: &[u8], tag: &Tag) -> Result<StoredObject> {
        let content_id = ContentId::new(Uuid::new_v4().to_string());
        let message_id = MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        let stored = self.compression.compress(data)?;

        let chunks = self.chunker.chunk_data(&stored);
        let mut chunk_ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if let Err(e) = fs::write(self.chunk_path(&chunk.id), &chunk.data).await {
                self.remove_chunks(&chunk_ids).await;
                return Err(FsError::StoreUnavailable(format!("failed to write chunk: {}", e)));
            }
            chunk_ids.push(chunk.id);
        }

        let manifest = Manifest {
            content_id: content_id.clone(),
            message_id,
            name: name.to_string(),
            tag: tag.clone(),
            size: data.len() as u64,
            stored_size: stored.len() as u64,
            compressed: self.compression.enabled(),
            checksum: Self::calculate_checksum(&stored),
            chunk_ids,
            created_at: Utc::now(),
        };
        let manifest_json = serde_json::to_string(&manifest)?;
        if let Err(e) = self.write_manifest(&content_id, manifest_json.as_bytes()).await {
            self.remove_chunks(&manifest.chunk_ids).await;
            return Err(FsError::StoreUnavailable(format!("failed to write manifest: {}", e)));
        }

        info!(name, %content_id, %message_id, size = data.len(), "object stored");
        Ok(StoredObject { content_id, message_id })
    }

    async fn download(&self, content_id: &ContentId) -> Result<Vec<u8>> {
        let manifest = self.read_manifest(content_id).await?;

        let mut stored = Vec::with_capacity(manifest.stored_size as usize);
        for chunk_id in &manifest.chunk_ids {
            match fs::read(self.chunk_path(chunk_id)).await {
                Ok(chunk) => stored.extend(chunk),
                Err(e) => {
                    return Err(FsError::StoreUnavailable(format!(
                        "chunk {} of {} is unreadable: {}",
                        chunk_id.0, content_id, e
                    )))
                }
            }
        }

        if stored.len() as u64 != manifest.stored_size || Self::calculate_checksum(&stored) != manifest.checksum {
            return Err(FsError::StoreUnavailable(format!("checksum mismatch for {}", content_id)));
        }

        self.compression.decompress(&stored, manifest.compressed)
    }

    async fn delete(&self, object: &StoredObject) -> Result<()> {
        let manifest = self.read_manifest(&object.content_id).await?;
        fs::remove_file(self.manifest_path(&object.content_id)).await?;
        self.remove_chunks(&manifest.chunk_ids).await;
        info!(content_id = %object.content_id, "object deleted");
        Ok(())
    }
}
