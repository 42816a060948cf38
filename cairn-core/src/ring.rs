use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const DEFAULT_VNODES: usize = 5;
pub const DEFAULT_REPLICAS: usize = 3;

/// Position on the hash ring: a 256-bit integer stored big-endian, so byte
/// ordering and numeric ordering coincide.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RingPosition([u8; 32]);

impl RingPosition {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for RingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RingPosition({})", hex::encode(self.0))
    }
}

impl fmt::Display for RingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Hash function mapping an identifier onto the ring. Every member of one
/// logical cluster must use the same function or their rings silently
/// diverge.
pub type HashFn = fn(&str) -> RingPosition;

/// Digest an identifier with SHA-256.
pub fn digest_position(value: &str) -> RingPosition {
    let digest = Sha256::digest(value.as_bytes());
    RingPosition(digest.into())
}

/// Content-aware position: a 64-character hex string is parsed directly as a
/// 256-bit integer, so content-addressed keys map onto the ring by their own
/// identity. Anything else (node and virtual-node identifiers) is digested.
pub fn content_position(value: &str) -> RingPosition {
    if value.len() == 64 {
        if let Ok(raw) = hex::decode(value) {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&raw);
            return RingPosition(bytes);
        }
    }
    digest_position(value)
}

/// Exported ring topology: physical node id to virtual-node count. Enough to
/// rebuild an equivalent ring given the same hash function; carries no key
/// ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingMetadata {
    pub physical_nodes: BTreeMap<String, usize>,
}

/// Consistent-hash ring with virtual nodes and replica lookup.
#[derive(Debug, Clone)]
pub struct HashRing {
    ring: BTreeMap<RingPosition, String>,
    virtual_nodes: HashMap<String, Vec<RingPosition>>,
    vnodes: usize,
    replicas: usize,
    hash: HashFn,
}

impl HashRing {
    pub fn new(vnodes: usize, replicas: usize) -> Self {
        Self::with_hash(vnodes, replicas, digest_position)
    }

    pub fn with_hash(vnodes: usize, replicas: usize, hash: HashFn) -> Self {
        Self {
            ring: BTreeMap::new(),
            virtual_nodes: HashMap::new(),
            vnodes,
            replicas,
            hash,
        }
    }

    pub fn vnodes(&self) -> usize {
        self.vnodes
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn contains_node(&self, physical_id: &str) -> bool {
        self.virtual_nodes.contains_key(physical_id)
    }

    pub fn physical_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.virtual_nodes.keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Add a physical node under the ring's default virtual-node count.
    pub fn add_node(&mut self, physical_id: &str) {
        self.add_node_with_count(physical_id, self.vnodes);
    }

    /// Add a physical node with an explicit virtual-node count. Virtual node
    /// identifiers are derived as `{id}-vn{i}`, so re-adding the same id
    /// produces identical hashes and is a no-op for slots already present.
    pub fn add_node_with_count(&mut self, physical_id: &str, virtual_count: usize) {
        for index in 0..virtual_count {
            let virtual_id = format!("{}-vn{}", physical_id, index);
            let position = (self.hash)(&virtual_id);
            if self.ring.contains_key(&position) {
                continue;
            }
            self.ring.insert(position, physical_id.to_string());
            self.virtual_nodes
                .entry(physical_id.to_string())
                .or_default()
                .push(position);
        }
    }

    /// Ring primitive only; not wired into any network protocol.
    pub fn remove_node(&mut self, physical_id: &str) {
        if let Some(positions) = self.virtual_nodes.remove(physical_id) {
            for position in positions {
                self.ring.remove(&position);
            }
        }
    }

    /// Owner of the first slot at or after the key's position, wrapping past
    /// the maximum. `None` on an empty ring.
    pub fn primary_node(&self, key: &str) -> Option<&str> {
        let position = (self.hash)(key);
        self.ring
            .range(position..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, owner)| owner.as_str())
    }

    /// All distinct owners for a key: clockwise walk from the key's position,
    /// collecting distinct physical ids until `replicas` are found or the
    /// whole ring has been scanned once.
    pub fn nodes_for(&self, key: &str) -> Vec<String> {
        let position = (self.hash)(key);
        let mut owners: Vec<String> = Vec::new();

        let walk = self.ring.range(position..).chain(self.ring.range(..position));
        for (_, owner) in walk {
            if owners.iter().any(|seen| seen == owner) {
                continue;
            }
            owners.push(owner.clone());
            if owners.len() == self.replicas {
                break;
            }
        }

        owners
    }

    pub fn virtual_positions(&self, physical_id: &str) -> &[RingPosition] {
        self.virtual_nodes
            .get(physical_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn export_metadata(&self) -> RingMetadata {
        RingMetadata {
            physical_nodes: self
                .virtual_nodes
                .iter()
                .map(|(id, positions)| (id.clone(), positions.len()))
                .collect(),
        }
    }

    /// Rebuild an equivalent ring from exported metadata. The reproduced
    /// virtual-node hashes are identical to the original's for every named
    /// physical node, given the same hash function.
    pub fn reconstruct(
        metadata: &RingMetadata,
        vnodes: usize,
        replicas: usize,
        hash: HashFn,
    ) -> Self {
        let mut ring = Self::with_hash(vnodes, replicas, hash);
        for (physical_id, virtual_count) in &metadata.physical_nodes {
            ring.add_node_with_count(physical_id, *virtual_count);
        }
        ring
    }
}
