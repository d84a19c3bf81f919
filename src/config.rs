//! JSON configuration for assembling a [`FileSystem`](crate::FileSystem).
//!
//! ```json
//! {
//!   "catalog": "sqlite",
//!   "registry": "journal",
//!   "database": "telefs.db",
//!   "journal": "mapping.journal",
//!   "store": { "path": "./storage", "compression": true, "chunk_size": 1048576 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Memory,
    Journal,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub compression: bool,
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./storage"),
            compression: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogKind,
    pub registry: RegistryKind,
    /// SQLite file shared by the relational catalog and registry.
    pub database: Option<PathBuf>,
    pub journal: PathBuf,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogKind::default(),
            registry: RegistryKind::default(),
            database: None,
            journal: PathBuf::from("mapping.journal"),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FsError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| FsError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn needs_database(&self) -> bool {
        self.catalog == CatalogKind::Sqlite || self.registry == RegistryKind::Sqlite
    }

    pub fn validate(&self) -> Result<()> {
        if self.needs_database() && self.database.is_none() {
            return Err(FsError::Config(
                "\"database\" is required when the catalog or registry is sqlite".to_string(),
            ));
        }
        Ok(())
    }
}
