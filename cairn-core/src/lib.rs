//! Cairn Core - cluster membership and key ownership for a peer-to-peer
//! blob store: consistent-hash ring, per-node key manager, peer connection
//! pool, and the invite/join/transfer choreography.

pub mod cluster;
pub mod error;
pub mod manager;
pub mod node;
pub mod operations;
pub mod ring;
pub mod storage;
pub mod store;

pub use cluster::{
    JoinRequest, NodeAddress, NodeAnnouncement, NodeData, PeerConnection, PeerPool, ProtocolAck,
    PEER_REQUEST_TIMEOUT,
};
pub use error::{CairnError, Result};
pub use manager::{KeyManager, KeyPlacement};
pub use node::NodeIdentity;
pub use operations::*;
pub use ring::{
    content_position, digest_position, HashRing, RingMetadata, RingPosition, DEFAULT_REPLICAS,
    DEFAULT_VNODES,
};
pub use storage::{compute_key, BlobStore, FsBlobStore};
pub use store::{KeyRecord, KeyValueStore};
