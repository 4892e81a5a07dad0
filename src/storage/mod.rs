mod local_fs;

pub use local_fs::LocalFileStorage;

use crate::errors::StorageError;
use async_trait::async_trait;
use tokio::fs::File;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// The storage directory is the registry: whatever sits in it is what exists.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<StoredFile>, StorageError>;
    async fn open(&self, name: &str) -> Result<(File, u64), StorageError>;
    async fn create(&self, name: &str) -> Result<Box<dyn PendingUpload>, StorageError>;
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// An upload being written. Dropping it without `commit` discards the bytes.
#[async_trait]
pub trait PendingUpload: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}
