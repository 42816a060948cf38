use crate::manager::KeyManager;
use crate::storage::BlobStore;
use crate::store::KeyRecord;
use crate::Result;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Write a blob locally and record key ownership, unconditionally. Ownership
/// is not checked at this layer: the coordinator routes writes, and incoming
/// transfers must land regardless of the receiver's current ring view.
#[derive(Clone)]
pub struct StoreBlobOperation {
    manager: Arc<RwLock<KeyManager>>,
    blob_store: Arc<dyn BlobStore>,
}

#[derive(Debug, Clone)]
pub struct StoreBlobRequest {
    pub username: String,
    pub key: String,
    pub file_name: String,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct StoreBlobResult {
    pub key: String,
    pub location: PathBuf,
    pub size_bytes: u64,
}

impl StoreBlobOperation {
    pub fn new(manager: Arc<RwLock<KeyManager>>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            manager,
            blob_store,
        }
    }

    pub async fn run(&self, request: StoreBlobRequest) -> Result<StoreBlobResult> {
        let size_bytes = request.body.len() as u64;
        let location = self
            .blob_store
            .write(&request.file_name, request.body)
            .await?;

        let record = KeyRecord::new(request.username, location.clone());
        self.manager.write().await.accept(&request.key, record);

        Ok(StoreBlobResult {
            key: request.key,
            location,
            size_bytes,
        })
    }
}
