use super::*;
use crate::policy;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

// In-flight uploads live here so a half written file never shows up in the
// listing, which only looks at regular files.
const PARTIAL_DIR: &str = ".partial";

pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(storage_path: PathBuf) -> Result<Self, StorageError> {
        if !storage_path.is_dir() {
            std::fs::create_dir_all(&storage_path)?;
            tracing::info!("Created storage directory {}", storage_path.display());
        }
        let partial = storage_path.join(PARTIAL_DIR);
        std::fs::create_dir_all(&partial)?;
        clear_partial(&partial)?;
        Ok(Self { storage_path })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.storage_path
    }

    async fn regular_file(&self, name: &str) -> Result<PathBuf, StorageError> {
        let path = policy::resolve(&self.storage_path, name).ok_or(StorageError::NotFound)?;
        let meta = fs::symlink_metadata(&path)
            .await
            .map_err(StorageError::from_io)?;
        if !meta.is_file() {
            return Err(StorageError::NotFound);
        }
        Ok(path)
    }
}

// Leftovers from uploads cut short by a crash or kill.
fn clear_partial(partial: &std::path::Path) -> Result<(), StorageError> {
    let mut removed = 0;
    for entry in std::fs::read_dir(partial)? {
        let path = entry?.path();
        if path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!("Removed {} stale partial uploads", removed);
    }
    Ok(())
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = fs::read_dir(&self.storage_path).await?;

        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            // file_type does not follow symlinks
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            // The file may vanish between read_dir and metadata.
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            files.push(StoredFile {
                name,
                size: meta.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn open(&self, name: &str) -> Result<(File, u64), StorageError> {
        let path = self.regular_file(name).await?;
        let file = File::open(&path).await.map_err(StorageError::from_io)?;
        // Size the handle, not the path: a rename may have replaced the file.
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StorageError::NotFound);
        }
        Ok((file, meta.len()))
    }

    async fn create(&self, name: &str) -> Result<Box<dyn PendingUpload>, StorageError> {
        let final_path = policy::resolve(&self.storage_path, name).ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{name:?} is not a valid storage key"),
            ))
        })?;
        let temp_path = self
            .storage_path
            .join(PARTIAL_DIR)
            .join(format!("{}.part", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;

        Ok(Box::new(LocalUpload {
            file,
            temp_path: Some(temp_path),
            final_path,
        }))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.regular_file(name).await?;
        fs::remove_file(path).await.map_err(StorageError::from_io)
    }
}

struct LocalUpload {
    file: File,
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
}

#[async_trait]
impl PendingUpload for LocalUpload {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(chunk).await?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        if let Some(temp_path) = &self.temp_path {
            // rename replaces an existing file of the same name
            fs::rename(temp_path, &self.final_path).await?;
        }
        self.temp_path = None;
        Ok(())
    }
}

impl Drop for LocalUpload {
    fn drop(&mut self) {
        if let Some(temp_path) = self.temp_path.take() {
            if let Err(err) = std::fs::remove_file(&temp_path) {
                tracing::warn!("Failed to remove {}: {}", temp_path.display(), err);
            }
        }
    }
}
