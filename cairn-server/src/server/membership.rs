use super::{response_error, ServerState};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use cairn_core::{CairnError, JoinRequest, NodeAnnouncement, ProtocolAck};
use std::sync::Arc;

/// Existing member: forward ring topology and the cluster address map to the
/// announced newcomer.
pub(crate) async fn invite_node(
    State(state): State<Arc<ServerState>>,
    Json(announcement): Json<NodeAnnouncement>,
) -> impl IntoResponse {
    match state.invite_node_operation.run(announcement).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(error @ (CairnError::Http(_) | CairnError::PeerUnreachable(_))) => {
            response_error(StatusCode::BAD_GATEWAY, error.to_string())
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

/// The newcomer: rebuild the ring, connect to every peer, and ask each of
/// them to hand over the keys this node now owns. Individual peer failures
/// are already absorbed by the operation; the reply is success once all
/// transfer requests have settled.
pub(crate) async fn join_ring(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<JoinRequest>,
) -> impl IntoResponse {
    match state.join_ring_operation.run(request).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ProtocolAck::success(format!(
                "joined ring; contacted {} of {} peer(s)",
                report.peers_contacted, report.peers_known
            ))),
        )
            .into_response(),
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

/// Existing member: admit the newcomer and stream over every key it now
/// owns. Per-key upload failures keep the local copy and are only reported.
pub(crate) async fn ring_transfer(
    State(state): State<Arc<ServerState>>,
    Json(announcement): Json<NodeAnnouncement>,
) -> impl IntoResponse {
    match state.ring_transfer_operation.run(announcement).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ProtocolAck::success(format!(
                "transferred {} of {} key(s), {} failed",
                report.keys_moved, report.keys_identified, report.keys_failed
            ))),
        )
            .into_response(),
        Err(error @ CairnError::PeerUnreachable(_)) => {
            response_error(StatusCode::BAD_GATEWAY, error.to_string())
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}
