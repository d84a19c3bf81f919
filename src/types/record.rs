use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::UNIX_EPOCH;

use super::ContentId;
use crate::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inode(pub u64);

impl fmt::Display for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The mounted root directory. Every catalog reserves it.
pub const ROOT_INODE: Inode = Inode(1);

/// `S_IFDIR | 0o755`
pub const DIR_MODE: u32 = 0o040_755;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub inode: Inode,
    pub parent: Inode,
    pub name: String,
    pub tag: Tag,
    /// Present only once an upload has been durably recorded.
    pub content_id: Option<ContentId>,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub rdev: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn attr(&self) -> Attr {
        Attr {
            inode: self.inode,
            kind: NodeKind::File,
            size: self.size,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            nlink: 1,
            atime: self.accessed_at,
            mtime: self.modified_at,
            ctime: self.created_at,
        }
    }
}

/// Everything a catalog needs to allocate a fresh record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub parent: Inode,
    pub name: String,
    pub tag: Tag,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub inode: Inode,
    pub kind: NodeKind,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
}

impl Attr {
    pub fn directory(inode: Inode) -> Self {
        let epoch = DateTime::<Utc>::from(UNIX_EPOCH);
        Self {
            inode,
            kind: NodeKind::Directory,
            size: 0,
            mode: DIR_MODE,
            uid: 0,
            gid: 0,
            nlink: 2,
            atime: epoch,
            mtime: epoch,
            ctime: epoch,
        }
    }
}
