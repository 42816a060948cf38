use super::{
    response_error, HealthResponse, KeyItem, KeysResponse, ServerState, TargetNodesQuery,
    TargetNodesResponse, UploadResponse,
};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cairn_core::{CairnError, StoreBlobRequest};
use std::sync::Arc;

pub(crate) async fn health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        node_id: state.node.node_id().to_string(),
    })
}

pub(crate) async fn upload_blob(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut username: Option<String> = None;
    let mut key: Option<String> = None;
    let mut file: Option<(Option<String>, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return response_error(StatusCode::BAD_REQUEST, error.to_string()),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => match field.text().await {
                Ok(value) => username = Some(value),
                Err(error) => return response_error(StatusCode::BAD_REQUEST, error.to_string()),
            },
            "key" => match field.text().await {
                Ok(value) => key = Some(value),
                Err(error) => return response_error(StatusCode::BAD_REQUEST, error.to_string()),
            },
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => file = Some((file_name, bytes)),
                    Err(error) => return response_error(StatusCode::BAD_REQUEST, error.to_string()),
                }
            }
            _ => {}
        }
    }

    let (Some(username), Some(key), Some((file_name, body))) = (username, key, file) else {
        return response_error(
            StatusCode::BAD_REQUEST,
            "multipart form requires username, key and file fields",
        );
    };
    let file_name = file_name.filter(|name| !name.is_empty()).unwrap_or_else(|| key.clone());

    let result = state
        .store_blob_operation
        .run(StoreBlobRequest {
            username: username.clone(),
            key: key.clone(),
            file_name: file_name.clone(),
            body,
        })
        .await;

    match result {
        Ok(_) => (
            StatusCode::OK,
            Json(UploadResponse {
                message: "File uploaded successfully".to_string(),
                filename: file_name,
                key,
                username,
            }),
        )
            .into_response(),
        Err(CairnError::InvalidRequest(message)) => {
            response_error(StatusCode::BAD_REQUEST, message)
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn fetch_blob(
    State(state): State<Arc<ServerState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let result = match state.fetch_blob_operation.run(&key).await {
        Ok(result) => result,
        // The two not-found causes stay distinguishable for clients.
        Err(CairnError::KeyNotFound(_)) => {
            return response_error(StatusCode::NOT_FOUND, "key not found");
        }
        Err(CairnError::BlobMissing { .. }) => {
            return response_error(StatusCode::NOT_FOUND, "key found but blob missing");
        }
        Err(error) => return response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };

    let file_name = result
        .record
        .location
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| key.clone());

    let mut response = Response::new(result.body.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename={}", file_name)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

pub(crate) async fn list_keys(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let manager = state.manager.read().await;
    let mut keys: Vec<KeyItem> = manager
        .entries()
        .map(|(key, record)| KeyItem {
            key: key.clone(),
            owner: record.owner.clone(),
            stored_at: record.stored_at.to_rfc3339(),
        })
        .collect();
    keys.sort_by(|a, b| a.key.cmp(&b.key));

    Json(KeysResponse {
        node_id: manager.node_id().to_string(),
        keys,
    })
}

pub(crate) async fn ring_metadata(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let metadata = state.manager.read().await.export_ring();
    Json(metadata)
}

pub(crate) async fn target_nodes(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TargetNodesQuery>,
) -> impl IntoResponse {
    let nodes = state.manager.read().await.owners_for(&query.key);
    Json(TargetNodesResponse {
        key: query.key,
        nodes,
    })
}
