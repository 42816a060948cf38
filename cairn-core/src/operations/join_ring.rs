use crate::cluster::pool::PeerPool;
use crate::cluster::types::JoinRequest;
use crate::manager::KeyManager;
use crate::node::NodeIdentity;
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

/// Second message of the join choreography, handled by the brand-new node: it
/// rebuilds its manager from the supplied ring topology, bootstraps
/// connections to every named peer, then asks each of them concurrently to
/// hand over the keys this node now owns.
///
/// Per-peer failures are logged and tolerated; the operation succeeds once
/// every transfer request has been dispatched and awaited.
#[derive(Clone)]
pub struct JoinRingOperation {
    local: NodeIdentity,
    manager: Arc<RwLock<KeyManager>>,
    pool: Arc<PeerPool>,
    vnodes: usize,
    replicas: usize,
}

#[derive(Debug, Clone)]
pub struct JoinRingReport {
    pub peers_known: usize,
    pub peers_contacted: usize,
    pub peers_failed: usize,
}

impl JoinRingOperation {
    pub fn new(
        local: NodeIdentity,
        manager: Arc<RwLock<KeyManager>>,
        pool: Arc<PeerPool>,
        vnodes: usize,
        replicas: usize,
    ) -> Self {
        Self {
            local,
            manager,
            pool,
            vnodes,
            replicas,
        }
    }

    pub async fn run(&self, request: JoinRequest) -> Result<JoinRingReport> {
        // A joining node carries no legacy data: replace the manager wholesale
        // with one rebuilt from the inviter's topology.
        {
            let mut manager = self.manager.write().await;
            *manager = KeyManager::reconstruct(
                &request.ring_metadata,
                self.local.node_id(),
                self.vnodes,
                self.replicas,
            );
        }

        let admitted = self
            .pool
            .initialize_connections(request.node_data.nodes.clone())
            .await;
        tracing::info!(
            "Joined ring with {} peer connection(s) of {} supplied",
            admitted,
            request.node_data.nodes.len().saturating_sub(1)
        );

        let announcement = self.local.announcement();
        let mut requests = JoinSet::new();
        let mut peers_known = 0;

        for node_id in request.node_data.nodes.keys() {
            if node_id == self.local.node_id() {
                continue;
            }
            peers_known += 1;

            let Some(connection) = self.pool.connection(node_id).await else {
                tracing::warn!("No connection for peer {}, skipping transfer request", node_id);
                continue;
            };
            let announcement = announcement.clone();
            requests.spawn(async move {
                let outcome = connection.transfer(&announcement).await;
                (connection.node_id().to_string(), outcome)
            });
        }

        let mut contacted = 0;
        while let Some(settled) = requests.join_next().await {
            match settled {
                Ok((peer, Ok(ack))) => {
                    contacted += 1;
                    tracing::info!("Peer {} accepted transfer request: {}", peer, ack.message);
                }
                Ok((peer, Err(error))) => {
                    tracing::warn!("Transfer request to {} failed: {}", peer, error);
                }
                Err(error) => {
                    tracing::warn!("Transfer request task failed: {}", error);
                }
            }
        }

        Ok(JoinRingReport {
            peers_known,
            peers_contacted: contacted,
            peers_failed: peers_known - contacted,
        })
    }
}
