//! Shared SQLite handle for the relational catalog and registry.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::{FsError, Result, DIR_MODE, ROOT_INODE};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS inodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid INTEGER NOT NULL,
    gid INTEGER NOT NULL,
    mode INTEGER NOT NULL,
    mtime_ns INTEGER NOT NULL,
    atime_ns INTEGER NOT NULL,
    ctime_ns INTEGER NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    rdev INTEGER NOT NULL DEFAULT 0,
    content_id TEXT,
    tag TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS contents (
    name TEXT NOT NULL,
    inode INTEGER NOT NULL REFERENCES inodes(id) ON DELETE CASCADE,
    parent_inode INTEGER NOT NULL,
    PRIMARY KEY (parent_inode, name)
);

CREATE INDEX IF NOT EXISTS contents_inode ON contents(inode);
CREATE INDEX IF NOT EXISTS inodes_tag ON inodes(tag);

CREATE TABLE IF NOT EXISTS message_mapping (
    content_id TEXT PRIMARY KEY,
    message_id INTEGER NOT NULL
);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO inodes (id, uid, gid, mode, mtime_ns, atime_ns, ctime_ns)
             VALUES (?1, 0, 0, ?2, 0, 0, 0)",
            rusqlite::params![ROOT_INODE.0 as i64, DIR_MODE],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| FsError::Persistence(format!("connection lock poisoned: {}", e)))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| FsError::Persistence(format!("database task failed: {}", e)))?
    }
}
