use crate::manager::KeyManager;
use crate::storage::BlobStore;
use crate::store::KeyRecord;
use crate::{CairnError, Result};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read a locally-held blob by key. The two not-found causes stay distinct:
/// an unknown key versus a known key whose backing blob has gone missing.
#[derive(Clone)]
pub struct FetchBlobOperation {
    manager: Arc<RwLock<KeyManager>>,
    blob_store: Arc<dyn BlobStore>,
}

#[derive(Debug, Clone)]
pub struct FetchBlobResult {
    pub record: KeyRecord,
    pub body: Bytes,
}

impl FetchBlobOperation {
    pub fn new(manager: Arc<RwLock<KeyManager>>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            manager,
            blob_store,
        }
    }

    pub async fn run(&self, key: &str) -> Result<FetchBlobResult> {
        let record = { self.manager.read().await.get(key).cloned() };
        let Some(record) = record else {
            return Err(CairnError::KeyNotFound(key.to_string()));
        };

        if !self.blob_store.exists(&record.location).await {
            return Err(CairnError::BlobMissing {
                key: key.to_string(),
                location: record.location.display().to_string(),
            });
        }

        let body = self.blob_store.read(&record.location).await?;
        Ok(FetchBlobResult { record, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsBlobStore;
    use crate::store::KeyRecord;

    async fn fixture() -> (FetchBlobOperation, Arc<RwLock<KeyManager>>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blob_store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(dir.path()).unwrap());
        let manager = Arc::new(RwLock::new(KeyManager::new("node1", 5, 3)));
        let operation = FetchBlobOperation::new(manager.clone(), blob_store);
        (operation, manager, dir)
    }

    #[tokio::test]
    async fn test_fetch_returns_stored_blob() {
        let (operation, manager, dir) = fixture().await;
        let blob_store = FsBlobStore::new(dir.path()).unwrap();
        let location = blob_store
            .write("photo.jpg", Bytes::from("image-bytes"))
            .await
            .unwrap();
        manager
            .write()
            .await
            .accept("key1", KeyRecord::new("alice", location));

        let result = operation.run("key1").await.unwrap();
        assert_eq!(result.body, Bytes::from("image-bytes"));
        assert_eq!(result.record.owner, "alice");
    }

    #[tokio::test]
    async fn test_unknown_key_is_key_not_found() {
        let (operation, _manager, _dir) = fixture().await;
        match operation.run("missing").await {
            Err(CairnError::KeyNotFound(key)) => assert_eq!(key, "missing"),
            other => panic!("expected KeyNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_missing_blob_is_distinct_and_keeps_the_key() {
        let (operation, manager, dir) = fixture().await;
        let blob_store = FsBlobStore::new(dir.path()).unwrap();
        let location = blob_store
            .write("photo.jpg", Bytes::from("image-bytes"))
            .await
            .unwrap();
        manager
            .write()
            .await
            .accept("key1", KeyRecord::new("alice", location.clone()));

        // Blob removed out-of-band; the key mapping stays.
        blob_store.remove(&location).await.unwrap();

        match operation.run("key1").await {
            Err(CairnError::BlobMissing { key, .. }) => assert_eq!(key, "key1"),
            other => panic!("expected BlobMissing, got {:?}", other.map(|_| ())),
        }
        assert!(manager.read().await.get("key1").is_some());
    }
}
