use crate::cluster::pool::{PeerConnection, PeerPool};
use crate::cluster::types::{JoinRequest, NodeAnnouncement, NodeData, ProtocolAck};
use crate::manager::KeyManager;
use crate::node::NodeIdentity;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// First message of the join choreography, handled by an existing member: the
/// control plane names a brand-new node, and this member forwards everything
/// the newcomer needs — the full id-to-address map of the cluster including
/// the newcomer, plus the exported ring topology — in a single `join_ring`
/// request sent directly to it.
///
/// Failure to reach the new node is surfaced to the inviter; no local state
/// changes either way.
#[derive(Clone)]
pub struct InviteNodeOperation {
    local: NodeIdentity,
    manager: Arc<RwLock<KeyManager>>,
    pool: Arc<PeerPool>,
    timeout: Duration,
}

impl InviteNodeOperation {
    pub fn new(
        local: NodeIdentity,
        manager: Arc<RwLock<KeyManager>>,
        pool: Arc<PeerPool>,
        timeout: Duration,
    ) -> Self {
        Self {
            local,
            manager,
            pool,
            timeout,
        }
    }

    pub async fn run(&self, announcement: NodeAnnouncement) -> Result<ProtocolAck> {
        let mut nodes = self.pool.addresses().await;
        nodes.insert(
            self.local.node_id().to_string(),
            self.local.address().clone(),
        );
        nodes.insert(announcement.node_id.clone(), announcement.address());

        let ring_metadata = { self.manager.read().await.export_ring() };
        let request = JoinRequest {
            node_data: NodeData { nodes },
            ring_metadata,
        };

        tracing::info!(
            "Inviting {} at {} into a ring of {} member(s)",
            announcement.node_id,
            announcement.address(),
            request.ring_metadata.physical_nodes.len()
        );

        // One-shot connection: the newcomer is not admitted into the pool
        // until it announces itself back through ring_transfer.
        let connection =
            PeerConnection::connect(&announcement.node_id, announcement.address(), self.timeout)?;
        let ack = connection.join(&request).await?;

        Ok(ack)
    }
}
