use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
    pub(crate) node_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) message: String,
    pub(crate) filename: String,
    pub(crate) key: String,
    pub(crate) username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeysResponse {
    pub(crate) node_id: String,
    pub(crate) keys: Vec<KeyItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyItem {
    pub(crate) key: String,
    pub(crate) owner: String,
    pub(crate) stored_at: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TargetNodesQuery {
    pub(crate) key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TargetNodesResponse {
    pub(crate) key: String,
    pub(crate) nodes: Vec<String>,
}
