pub mod pool;
pub mod types;

pub use pool::{PeerConnection, PeerPool, PEER_REQUEST_TIMEOUT};
pub use types::{JoinRequest, NodeAddress, NodeAnnouncement, NodeData, ProtocolAck};
