use crate::ring::RingMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Network address of a peer as carried by the join choreography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub ip: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Body of `invite_node` and `ring_transfer`: one node announcing itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAnnouncement {
    pub node_id: String,
    pub ip: String,
    pub port: u16,
}

impl NodeAnnouncement {
    pub fn address(&self) -> NodeAddress {
        NodeAddress::new(&self.ip, self.port)
    }
}

/// Body of `join_ring`: the inviter's full address map plus its exported ring
/// topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub node_data: NodeData,
    pub ring_metadata: RingMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub nodes: BTreeMap<String, NodeAddress>,
}

/// Uniform `{status, message}` reply for the membership endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolAck {
    pub status: String,
    pub message: String,
}

impl ProtocolAck {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
