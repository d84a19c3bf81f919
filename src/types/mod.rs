mod object;
mod record;

pub use object::{ContentId, MessageId, StoredObject};
pub use record::{Attr, FileRecord, Inode, NewRecord, NodeKind, DIR_MODE, ROOT_INODE};
