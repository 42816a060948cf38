mod fetch_blob;
mod invite_node;
mod join_ring;
mod ring_transfer;
mod store_blob;

pub use fetch_blob::{FetchBlobOperation, FetchBlobResult};
pub use invite_node::InviteNodeOperation;
pub use join_ring::{JoinRingOperation, JoinRingReport};
pub use ring_transfer::{RingTransferOperation, RingTransferReport};
pub use store_blob::{StoreBlobOperation, StoreBlobRequest, StoreBlobResult};
