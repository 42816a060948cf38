use crate::config::Config;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cairn_core::{
    CairnError, FetchBlobOperation, FsBlobStore, InviteNodeOperation, JoinRingOperation,
    KeyManager, NodeIdentity, PeerPool, Result, RingTransferOperation, StoreBlobOperation,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

mod external;
mod membership;
mod types;

use external::{fetch_blob, health, list_keys, ring_metadata, target_nodes, upload_blob};
use membership::{invite_node, join_ring, ring_transfer};
pub(crate) use types::*;

/// Per-process composition root: one identity, one manager, one connection
/// pool, one blob store, built once at startup and shared by every handler.
pub struct ServerState {
    pub(crate) node: NodeIdentity,
    pub(crate) manager: Arc<RwLock<KeyManager>>,
    pub(crate) store_blob_operation: StoreBlobOperation,
    pub(crate) fetch_blob_operation: FetchBlobOperation,
    pub(crate) invite_node_operation: InviteNodeOperation,
    pub(crate) join_ring_operation: JoinRingOperation,
    pub(crate) ring_transfer_operation: RingTransferOperation,
}

pub async fn run_server(config: Config) -> Result<()> {
    let node = NodeIdentity::new(&config.node.node_id, config.advertise_address());

    let manager = Arc::new(RwLock::new(KeyManager::new(
        &config.node.node_id,
        config.ring.vnodes,
        config.ring.replicas,
    )));
    let pool = Arc::new(PeerPool::with_timeout(
        &config.node.node_id,
        config.peer_timeout(),
    ));
    let blob_store: Arc<dyn cairn_core::BlobStore> =
        Arc::new(FsBlobStore::new(&config.node.store_dir)?);

    let state = Arc::new(ServerState {
        node: node.clone(),
        manager: manager.clone(),
        store_blob_operation: StoreBlobOperation::new(manager.clone(), blob_store.clone()),
        fetch_blob_operation: FetchBlobOperation::new(manager.clone(), blob_store.clone()),
        invite_node_operation: InviteNodeOperation::new(
            node.clone(),
            manager.clone(),
            pool.clone(),
            config.peer_timeout(),
        ),
        join_ring_operation: JoinRingOperation::new(
            node.clone(),
            manager.clone(),
            pool.clone(),
            config.ring.vnodes,
            config.ring.replicas,
        ),
        ring_transfer_operation: RingTransferOperation::new(manager, pool, blob_store),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_blob))
        .route("/fetch/:key", get(fetch_blob))
        .route("/keys", get(list_keys))
        .route("/ring", get(ring_metadata))
        .route("/target_nodes", get(target_nodes))
        .route("/invite_node", post(invite_node))
        .route("/join_ring", post(join_ring))
        .route("/ring_transfer", post(ring_transfer))
        .with_state(state);

    let listener = TcpListener::bind(&config.node.bind_addr).await?;
    tracing::info!(
        "Cairn node {} listening on {} (advertised as {})",
        config.node.node_id,
        config.node.bind_addr,
        node.address()
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| CairnError::Http(error.to_string()))?;

    Ok(())
}

pub(crate) fn response_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
