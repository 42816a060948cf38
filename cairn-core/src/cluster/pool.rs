use crate::cluster::types::{JoinRequest, NodeAddress, NodeAnnouncement, ProtocolAck};
use crate::error::{CairnError, Result};
use bytes::Bytes;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

pub const PEER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistent outbound connection to one peer: a reqwest client pinned to the
/// peer's base address, with a bounded total-request timeout.
#[derive(Clone)]
pub struct PeerConnection {
    node_id: String,
    address: NodeAddress,
    client: Client,
}

impl PeerConnection {
    pub fn connect(node_id: &str, address: NodeAddress, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CairnError::Http(error.to_string()))?;

        Ok(Self {
            node_id: node_id.to_string(),
            address,
            client,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address.base_url(), path)
    }

    /// One liveness probe; any non-2xx status or transport failure is an
    /// error.
    pub async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))?;

        if !response.status().is_success() {
            return Err(CairnError::Http(format!(
                "liveness probe failed: node={} status={}",
                self.node_id,
                response.status()
            )));
        }

        Ok(())
    }

    pub async fn invite(&self, announcement: &NodeAnnouncement) -> Result<ProtocolAck> {
        self.post_json("/invite_node", announcement).await
    }

    pub async fn join(&self, request: &JoinRequest) -> Result<ProtocolAck> {
        self.post_json("/join_ring", request).await
    }

    pub async fn transfer(&self, announcement: &NodeAnnouncement) -> Result<ProtocolAck> {
        self.post_json("/ring_transfer", announcement).await
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<ProtocolAck> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))?;

        if !response.status().is_success() {
            return Err(CairnError::Http(format!(
                "request to {}{} failed: status={}",
                self.node_id,
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))
    }

    /// Stream one blob to the peer's upload endpoint with the key and the
    /// original uploading username attached.
    pub async fn upload(
        &self,
        username: &str,
        key: &str,
        file_name: &str,
        body: Bytes,
    ) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(body.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("username", username.to_string())
            .text("key", key.to_string())
            .part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))?;

        if !response.status().is_success() {
            return Err(CairnError::Http(format!(
                "upload of key {} to {} failed: status={}",
                key,
                self.node_id,
                response.status()
            )));
        }

        Ok(())
    }

    pub async fn fetch(&self, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.url(&format!("/fetch/{}", key)))
            .send()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))?;

        if !response.status().is_success() {
            return Err(CairnError::Http(format!(
                "fetch of key {} from {} failed: status={}",
                key,
                self.node_id,
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|error| CairnError::Http(error.to_string()))
    }
}

/// One live outbound connection per known peer. A connection is admitted only
/// after a successful liveness probe; the owning node never connects to
/// itself.
pub struct PeerPool {
    local_node_id: String,
    timeout: Duration,
    peers: RwLock<HashMap<String, PeerConnection>>,
}

impl PeerPool {
    pub fn new(local_node_id: impl Into<String>) -> Self {
        Self::with_timeout(local_node_id, PEER_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(local_node_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            local_node_id: local_node_id.into(),
            timeout,
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn local_node_id(&self) -> &str {
        &self.local_node_id
    }

    /// Probe and admit one peer. Returns false on any connect, timeout, or
    /// probe failure; the connection is dropped and never inserted. Adding
    /// the local node is a recognized no-op.
    pub async fn add_node(&self, node_id: &str, address: NodeAddress) -> bool {
        if node_id == self.local_node_id {
            return true;
        }

        let connection = match PeerConnection::connect(node_id, address.clone(), self.timeout) {
            Ok(connection) => connection,
            Err(error) => {
                tracing::warn!("Failed to build connection for {}: {}", node_id, error);
                return false;
            }
        };

        match connection.probe().await {
            Ok(()) => {
                tracing::info!("Admitted peer {} at {}", node_id, address);
                self.peers
                    .write()
                    .await
                    .insert(node_id.to_string(), connection);
                true
            }
            Err(error) => {
                tracing::warn!("Peer {} at {} failed liveness probe: {}", node_id, address, error);
                false
            }
        }
    }

    /// Pooled connection, or `None` if the peer was never admitted. Never
    /// connects on demand.
    pub async fn connection(&self, node_id: &str) -> Option<PeerConnection> {
        self.peers.read().await.get(node_id).cloned()
    }

    pub async fn contains(&self, node_id: &str) -> bool {
        self.peers.read().await.contains_key(node_id)
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Rebuildable id-to-address map of every admitted peer.
    pub async fn addresses(&self) -> BTreeMap<String, NodeAddress> {
        self.peers
            .read()
            .await
            .iter()
            .map(|(id, connection)| (id.clone(), connection.address().clone()))
            .collect()
    }

    /// Bootstrap fan-out: probe every supplied peer concurrently and wait for
    /// all probes to settle. Individual failures are logged and never abort
    /// the siblings. Returns the number of peers admitted.
    pub async fn initialize_connections(&self, nodes: BTreeMap<String, NodeAddress>) -> usize {
        let mut probes: JoinSet<Option<(String, PeerConnection)>> = JoinSet::new();

        for (node_id, address) in nodes {
            if node_id == self.local_node_id {
                continue;
            }
            let timeout = self.timeout;
            probes.spawn(async move {
                let connection = match PeerConnection::connect(&node_id, address.clone(), timeout) {
                    Ok(connection) => connection,
                    Err(error) => {
                        tracing::warn!("Failed to build connection for {}: {}", node_id, error);
                        return None;
                    }
                };
                match connection.probe().await {
                    Ok(()) => Some((node_id, connection)),
                    Err(error) => {
                        tracing::warn!(
                            "Peer {} at {} failed liveness probe: {}",
                            node_id,
                            address,
                            error
                        );
                        None
                    }
                }
            });
        }

        let mut admitted = 0;
        while let Some(settled) = probes.join_next().await {
            match settled {
                Ok(Some((node_id, connection))) => {
                    tracing::info!("Admitted peer {} at {}", node_id, connection.address());
                    self.peers.write().await.insert(node_id, connection);
                    admitted += 1;
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!("Connection probe task failed: {}", error);
                }
            }
        }

        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_adding_self_is_a_no_op() {
        let pool = PeerPool::new("node1");
        let admitted = pool.add_node("node1", NodeAddress::new("127.0.0.1", 9999)).await;
        assert!(admitted);
        assert!(pool.connection("node1").await.is_none());
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_never_inserted() {
        let pool = PeerPool::with_timeout("node1", Duration::from_millis(500));
        // Port 1 refuses connections on loopback.
        let admitted = pool.add_node("node2", NodeAddress::new("127.0.0.1", 1)).await;
        assert!(!admitted);
        assert!(pool.connection("node2").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_of_unknown_peer_is_none() {
        let pool = PeerPool::new("node1");
        assert!(pool.connection("node2").await.is_none());
        assert!(!pool.contains("node2").await);
        assert!(pool.addresses().await.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_tolerates_individual_failures() {
        let pool = PeerPool::with_timeout("node1", Duration::from_millis(500));
        let mut nodes = BTreeMap::new();
        nodes.insert("node1".to_string(), NodeAddress::new("127.0.0.1", 9991));
        nodes.insert("node2".to_string(), NodeAddress::new("127.0.0.1", 1));
        nodes.insert("node3".to_string(), NodeAddress::new("127.0.0.1", 1));

        let admitted = pool.initialize_connections(nodes).await;
        assert_eq!(admitted, 0);
        assert_eq!(pool.len().await, 0);
    }
}
