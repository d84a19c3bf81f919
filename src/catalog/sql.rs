use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::Catalog;
use crate::db::Database;
use crate::{ContentId, FileRecord, FsError, Inode, NewRecord, Result, Tag};

const SELECT_RECORD: &str = "
    SELECT i.id, c.parent_inode, c.name, i.uid, i.gid, i.mode,
           i.mtime_ns, i.atime_ns, i.ctime_ns, i.size, i.rdev, i.content_id, i.tag
    FROM contents c
    JOIN inodes i ON c.inode = i.id";

/// Relational catalog. Each mutation runs as a single transaction.
#[derive(Clone)]
pub struct SqlCatalog {
    db: Database,
}

impl SqlCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn to_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        inode: Inode(row.get::<_, i64>(0)? as u64),
        parent: Inode(row.get::<_, i64>(1)? as u64),
        name: row.get(2)?,
        uid: row.get(3)?,
        gid: row.get(4)?,
        mode: row.get(5)?,
        modified_at: Utc.timestamp_nanos(row.get(6)?),
        accessed_at: Utc.timestamp_nanos(row.get(7)?),
        created_at: Utc.timestamp_nanos(row.get(8)?),
        size: row.get::<_, i64>(9)? as u64,
        rdev: row.get::<_, i64>(10)? as u64,
        content_id: row.get::<_, Option<String>>(11)?.map(ContentId::from),
        tag: Tag::new(row.get::<_, String>(12)?),
    })
}

fn not_found(inode: Inode) -> FsError {
    FsError::NotFound(format!("inode {}", inode))
}

#[async_trait]
impl Catalog for SqlCatalog {
    async fn lookup(&self, parent: Inode, name: &str) -> Result<FileRecord> {
        let name = name.to_string();
        self.db
            .with_conn(move |conn| {
                conn.query_row(
                    &format!("{SELECT_RECORD} WHERE c.parent_inode = ?1 AND c.name = ?2"),
                    params![parent.0 as i64, name],
                    record_from_row,
                )
                .optional()?
                .ok_or_else(|| FsError::NotFound(name.clone()))
            })
            .await
    }

    async fn get(&self, inode: Inode) -> Result<FileRecord> {
        self.db
            .with_conn(move |conn| {
                conn.query_row(
                    &format!("{SELECT_RECORD} WHERE i.id = ?1"),
                    params![inode.0 as i64],
                    record_from_row,
                )
                .optional()?
                .ok_or_else(|| not_found(inode))
            })
            .await
    }

    async fn list(&self, parent: Inode) -> Result<Vec<FileRecord>> {
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT_RECORD} WHERE c.parent_inode = ?1"))?;
                let records = stmt
                    .query_map(params![parent.0 as i64], record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    async fn create(&self, new: NewRecord) -> Result<FileRecord> {
        self.db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM contents WHERE parent_inode = ?1 AND name = ?2)",
                    params![new.parent.0 as i64, new.name],
                    |row| row.get(0),
                )?;
                if exists {
                    return Err(FsError::AlreadyExists(new.name));
                }

                let now = Utc::now();
                let now_ns = to_nanos(now);
                tx.execute(
                    "INSERT INTO inodes (uid, gid, mode, mtime_ns, atime_ns, ctime_ns, size, rdev, content_id, tag)
                     VALUES (?1, ?2, ?3, ?4, ?4, ?4, 0, 0, NULL, ?5)",
                    params![new.uid, new.gid, new.mode, now_ns, new.tag.as_str()],
                )?;
                let inode = Inode(tx.last_insert_rowid() as u64);
                tx.execute(
                    "INSERT INTO contents (name, inode, parent_inode) VALUES (?1, ?2, ?3)",
                    params![new.name, inode.0 as i64, new.parent.0 as i64],
                )?;
                tx.commit()?;
                debug!(%inode, name = %new.name, "catalog row created");

                // Round-trip through the stored nanosecond precision.
                let stamp = Utc.timestamp_nanos(now_ns);
                Ok(FileRecord {
                    inode,
                    parent: new.parent,
                    name: new.name,
                    tag: new.tag,
                    content_id: None,
                    size: 0,
                    uid: new.uid,
                    gid: new.gid,
                    mode: new.mode,
                    rdev: 0,
                    created_at: stamp,
                    modified_at: stamp,
                    accessed_at: stamp,
                })
            })
            .await
    }

    async fn commit_content(&self, inode: Inode, content_id: ContentId, size: u64) -> Result<Option<ContentId>> {
        self.db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let previous: Option<String> = tx
                    .query_row(
                        "SELECT content_id FROM inodes WHERE id = ?1",
                        params![inode.0 as i64],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| not_found(inode))?;
                tx.execute(
                    "UPDATE inodes SET content_id = ?1, size = ?2, mtime_ns = ?3 WHERE id = ?4",
                    params![content_id.as_str(), size as i64, to_nanos(Utc::now()), inode.0 as i64],
                )?;
                tx.commit()?;
                Ok(previous.map(ContentId::from))
            })
            .await
    }

    async fn remove(&self, inode: Inode) -> Result<FileRecord> {
        self.db
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let record = tx
                    .query_row(
                        &format!("{SELECT_RECORD} WHERE i.id = ?1"),
                        params![inode.0 as i64],
                        record_from_row,
                    )
                    .optional()?
                    .ok_or_else(|| not_found(inode))?;
                tx.execute("DELETE FROM contents WHERE inode = ?1", params![inode.0 as i64])?;
                tx.execute("DELETE FROM inodes WHERE id = ?1", params![inode.0 as i64])?;
                tx.commit()?;
                debug!(%inode, name = %record.name, "catalog row removed");
                Ok(record)
            })
            .await
    }

    async fn find_by_tag(&self, tag: &Tag) -> Result<Vec<FileRecord>> {
        let tag = tag.clone();
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!("{SELECT_RECORD} WHERE i.tag = ?1"))?;
                let records = stmt
                    .query_map(params![tag.as_str()], record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }
}
