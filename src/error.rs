use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
    #[error("Content store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Persistence failure: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FsError {
    /// Errno reported to the filesystem runtime. Only a missing entry is
    /// distinguishable; everything else surfaces as a generic I/O failure.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            _ => libc::EIO,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }

    /// Transport failures may succeed on a later attempt; nothing else does.
    pub fn is_transient(&self) -> bool {
        matches!(self, FsError::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for FsError {
    fn from(err: rusqlite::Error) -> Self {
        FsError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for FsError {
    fn from(err: serde_json::Error) -> Self {
        FsError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
