use crate::cluster::types::{NodeAddress, NodeAnnouncement};

/// Identity of the local process: stable node id plus the address peers use
/// to reach it.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    node_id: String,
    address: NodeAddress,
}

impl NodeIdentity {
    pub fn new(node_id: impl Into<String>, address: NodeAddress) -> Self {
        Self {
            node_id: node_id.into(),
            address,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// How this node introduces itself in the join choreography.
    pub fn announcement(&self) -> NodeAnnouncement {
        NodeAnnouncement {
            node_id: self.node_id.clone(),
            ip: self.address.ip.clone(),
            port: self.address.port,
        }
    }
}
