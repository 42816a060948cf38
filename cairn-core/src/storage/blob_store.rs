use crate::error::{CairnError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Opaque blob persistence: write bytes under a name, read them back by
/// locator, check existence, delete. The membership protocol only ever talks
/// to this seam.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, file_name: &str, data: Bytes) -> Result<PathBuf>;
    async fn read(&self, location: &Path) -> Result<Bytes>;
    async fn exists(&self, location: &Path) -> bool;
    async fn remove(&self, location: &Path) -> Result<()>;
}

/// Filesystem-backed blob store: one flat directory of blob files, written
/// through a temp file and renamed into place.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name == "."
            || file_name == ".."
        {
            return Err(CairnError::InvalidRequest(format!(
                "invalid blob file name: {}",
                file_name
            )));
        }
        Ok(self.base_path.join(file_name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(&self, file_name: &str, data: Bytes) -> Result<PathBuf> {
        let blob_path = self.blob_path(file_name)?;

        let tmp_path = blob_path.with_extension(format!("{}.tmp", ulid::Ulid::new()));
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &blob_path).await?;

        Ok(blob_path)
    }

    async fn read(&self, location: &Path) -> Result<Bytes> {
        let bytes = fs::read(location).await?;
        Ok(Bytes::from(bytes))
    }

    async fn exists(&self, location: &Path) -> bool {
        fs::try_exists(location).await.unwrap_or(false)
    }

    async fn remove(&self, location: &Path) -> Result<()> {
        fs::remove_file(location).await?;
        Ok(())
    }
}
