use cairn_core::{CairnError, NodeAddress, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub ring: RingConfig,
    #[serde(default)]
    pub peers: PeerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    /// Address the HTTP listener binds to, e.g. "0.0.0.0:8000".
    pub bind_addr: String,
    /// Address peers use to reach this node.
    pub advertise_ip: String,
    pub advertise_port: u16,
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_vnodes")]
    pub vnodes: usize,
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            vnodes: default_vnodes(),
            replicas: default_replicas(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./store")
}

fn default_vnodes() -> usize {
    10
}

fn default_replicas() -> usize {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(::config::Environment::with_prefix("CAIRN"))
            .build()
            .map_err(|e| CairnError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| CairnError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn advertise_address(&self) -> NodeAddress {
        NodeAddress::new(&self.node.advertise_ip, self.node.advertise_port)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peers.request_timeout_secs)
    }
}
