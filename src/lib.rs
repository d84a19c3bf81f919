pub mod catalog;
pub mod chunk;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod node;
pub mod registry;
pub mod store;
pub mod tag;

mod types;

pub use client::ContentClient;
pub use config::Config;
pub use error::{FsError, Result};
pub use node::{CreateRequest, DirNode, DirectoryOps, FileNode, FileOps, FileSystem};
pub use tag::Tag;
pub use types::*;
