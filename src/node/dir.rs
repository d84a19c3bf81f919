use async_trait::async_trait;
use tracing::debug;

use super::{CreateRequest, DirectoryOps, FileNode, FileSystem};
use crate::tag::TAG_GROUP_PREFIX;
use crate::{Attr, FileRecord, FsError, Inode, NewRecord, Result, Tag};

#[derive(Clone)]
pub struct DirNode {
    fs: FileSystem,
    inode: Inode,
}

impl DirNode {
    pub(super) fn new(fs: FileSystem, inode: Inode) -> Self {
        Self { fs, inode }
    }

    pub fn inode(&self) -> Inode {
        self.inode
    }
}

/// Also rejects names whose tag would be empty, since `#` alone cannot
/// address their group.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') || name.starts_with(TAG_GROUP_PREFIX) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    if Tag::from_name(name).as_str().is_empty() {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl DirectoryOps for DirNode {
    async fn attr(&self) -> Attr {
        Attr::directory(self.inode)
    }

    async fn lookup(&self, name: &str) -> Result<FileNode> {
        let record = self.fs.shared.catalog.lookup(self.inode, name).await?;
        Ok(FileNode::new(self.fs.clone(), record))
    }

    async fn read_dir_all(&self) -> Result<Vec<FileRecord>> {
        self.fs.shared.catalog.list(self.inode).await
    }

    async fn create(&self, request: CreateRequest) -> Result<FileNode> {
        validate_name(&request.name)?;
        let tag = Tag::from_name(&request.name);
        let record = self
            .fs
            .shared
            .catalog
            .create(NewRecord {
                parent: self.inode,
                name: request.name,
                tag,
                mode: request.mode,
                uid: request.uid,
                gid: request.gid,
            })
            .await?;
        debug!(inode = %record.inode, name = %record.name, tag = %record.tag, "file created");
        Ok(FileNode::new(self.fs.clone(), record))
    }

    async fn remove(&self, name: &str) -> Result<()> {
        match self.fs.shared.catalog.lookup(self.inode, name).await {
            Ok(record) => self.fs.remove_record(&record).await,
            Err(e) if e.is_not_found() => match Tag::from_group_name(name) {
                Some(tag) => self.fs.delete_tag_group(&tag).await.map(|_| ()),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}
