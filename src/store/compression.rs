use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::prelude::*;

use crate::{FsError, Result};

/// Optional gzip pass applied to payloads before they hit disk.
#[derive(Debug, Clone, Copy)]
pub struct CompressionManager {
    enabled: bool,
}

impl CompressionManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.enabled {
            return Ok(data.to_vec());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        encoder
            .finish()
            .map_err(|e| FsError::StoreUnavailable(format!("compression failed: {}", e)))
    }

    /// `compressed` records how the payload was written, which may differ
    /// from the current setting.
    pub fn decompress(&self, data: &[u8], compressed: bool) -> Result<Vec<u8>> {
        if !compressed {
            return Ok(data.to_vec());
        }

        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| FsError::StoreUnavailable(format!("decompression failed: {}", e)))?;
        Ok(decompressed)
    }
}
