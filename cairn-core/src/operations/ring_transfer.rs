use crate::cluster::pool::PeerPool;
use crate::cluster::types::NodeAnnouncement;
use crate::manager::KeyManager;
use crate::storage::BlobStore;
use crate::{CairnError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Third message of the join choreography, handled by each existing member:
/// admit the announcing node, recompute local ownership against the grown
/// ring, and stream every key that now belongs to the newcomer to its upload
/// endpoint. A key and its blob are deleted locally only after the upload is
/// confirmed; a failed upload leaves both untouched for a future retry.
#[derive(Clone)]
pub struct RingTransferOperation {
    manager: Arc<RwLock<KeyManager>>,
    pool: Arc<PeerPool>,
    blob_store: Arc<dyn BlobStore>,
}

#[derive(Debug, Clone)]
pub struct RingTransferReport {
    pub keys_identified: usize,
    pub keys_moved: usize,
    pub keys_failed: usize,
}

impl RingTransferOperation {
    pub fn new(
        manager: Arc<RwLock<KeyManager>>,
        pool: Arc<PeerPool>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            manager,
            pool,
            blob_store,
        }
    }

    pub async fn run(&self, announcement: NodeAnnouncement) -> Result<RingTransferReport> {
        let admitted = self
            .pool
            .add_node(&announcement.node_id, announcement.address())
            .await;
        if !admitted {
            return Err(CairnError::PeerUnreachable(format!(
                "{} at {}",
                announcement.node_id,
                announcement.address()
            )));
        }

        // Ring mutation and hand-off computation are purely in-memory; all
        // network traffic happens after the lock is released.
        let transfer_keys = {
            self.manager
                .write()
                .await
                .add_node(&announcement.node_id)
        };

        if transfer_keys.is_empty() {
            return Ok(RingTransferReport {
                keys_identified: 0,
                keys_moved: 0,
                keys_failed: 0,
            });
        }

        let Some(connection) = self.pool.connection(&announcement.node_id).await else {
            return Err(CairnError::Internal(format!(
                "peer {} vanished from the pool mid-transfer",
                announcement.node_id
            )));
        };

        tracing::info!(
            "Handing {} key(s) over to {}",
            transfer_keys.len(),
            announcement.node_id
        );

        let mut moved = 0;
        let mut failed = 0;
        for key in &transfer_keys {
            let record = { self.manager.read().await.get(key).cloned() };
            let Some(record) = record else {
                tracing::warn!("Key {} vanished before transfer", key);
                failed += 1;
                continue;
            };

            let body = match self.blob_store.read(&record.location).await {
                Ok(body) => body,
                Err(error) => {
                    tracing::warn!("Failed to read blob for key {}: {}", key, error);
                    failed += 1;
                    continue;
                }
            };

            let file_name = record
                .location
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| key.clone());

            match connection.upload(&record.owner, key, &file_name, body).await {
                Ok(()) => {
                    // Delivery confirmed: drop the local copy.
                    self.manager
                        .write()
                        .await
                        .complete_transfer(&announcement.node_id, key);
                    if let Err(error) = self.blob_store.remove(&record.location).await {
                        tracing::warn!(
                            "Failed to delete transferred blob {}: {}",
                            record.location.display(),
                            error
                        );
                    }
                    moved += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        "Transfer of key {} to {} failed, keeping local copy: {}",
                        key,
                        announcement.node_id,
                        error
                    );
                    failed += 1;
                }
            }
        }

        tracing::info!(
            "Transfer to {} complete: {} moved, {} failed of {}",
            announcement.node_id,
            moved,
            failed,
            transfer_keys.len()
        );

        Ok(RingTransferReport {
            keys_identified: transfer_keys.len(),
            keys_moved: moved,
            keys_failed: failed,
        })
    }
}
