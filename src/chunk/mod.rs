use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChunkId(pub Uuid);

#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
}

/// Splits payloads into fixed-size pieces for the local store.
#[derive(Debug, Clone)]
pub struct FileChunker {
    chunk_size: usize,
}

impl Default for FileChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl FileChunker {
    /// A zero size falls back to the default.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_data(&self, data: &[u8]) -> Vec<Chunk> {
        data.chunks(self.chunk_size)
            .map(|piece| Chunk {
                id: ChunkId(Uuid::new_v4()),
                data: piece.to_vec(),
            })
            .collect()
    }
}
