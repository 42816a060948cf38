use crate::ring::{content_position, HashRing, RingMetadata};
use crate::store::{KeyRecord, KeyValueStore};
use std::collections::{HashMap, HashSet};

/// Outcome of an ownership-checked write.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPlacement {
    Stored,
    /// The local node is not among the key's owners; the caller is expected
    /// to forward the write to one of these.
    NotResponsible(Vec<String>),
}

/// Per-node distributed key-value manager: one hash ring, one local store,
/// and the set of keys pending hand-off to newly joined nodes.
///
/// Mutating methods are synchronous and purely in-memory; callers perform all
/// network and file I/O strictly before or after holding a reference.
#[derive(Debug)]
pub struct KeyManager {
    node_id: String,
    nodes: HashSet<String>,
    ring: HashRing,
    store: KeyValueStore,
    pending_transfers: HashMap<String, HashSet<String>>,
}

impl KeyManager {
    /// A freshly started node is the sole member of its own ring.
    pub fn new(node_id: impl Into<String>, vnodes: usize, replicas: usize) -> Self {
        let node_id = node_id.into();
        let mut ring = HashRing::with_hash(vnodes, replicas, content_position);
        ring.add_node(&node_id);

        let mut nodes = HashSet::new();
        nodes.insert(node_id.clone());

        Self {
            node_id,
            nodes,
            ring,
            store: KeyValueStore::new(),
            pending_transfers: HashMap::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn is_member(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn known_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.nodes.iter().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Store the key locally only if this node is among its owners; otherwise
    /// report the responsible set so the caller can forward the write.
    pub fn insert(&mut self, key: &str, record: KeyRecord) -> KeyPlacement {
        let owners = self.ring.nodes_for(key);
        if owners.iter().any(|owner| owner == &self.node_id) {
            self.store.insert(key, record);
            KeyPlacement::Stored
        } else {
            KeyPlacement::NotResponsible(owners)
        }
    }

    /// Store the key unconditionally. The upload and transfer-receive paths
    /// perform no ownership check.
    pub fn accept(&mut self, key: &str, record: KeyRecord) {
        self.store.insert(key, record);
    }

    pub fn get(&self, key: &str) -> Option<&KeyRecord> {
        self.store.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<KeyRecord> {
        self.store.remove(key)
    }

    pub fn local_keys(&self) -> Vec<String> {
        self.store.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &KeyRecord)> {
        self.store.iter()
    }

    pub fn owners_for(&self, key: &str) -> Vec<String> {
        self.ring.nodes_for(key)
    }

    /// Admit a new member and compute the hand-off set: every locally-held
    /// key whose new owner set contains the new node and no longer contains
    /// this one. Candidates are recorded under `pending_transfers` and stay
    /// in the local store until delivery is confirmed. Re-adding a known
    /// member is a no-op returning an empty set.
    pub fn add_node(&mut self, new_node: &str) -> Vec<String> {
        if self.nodes.contains(new_node) {
            return Vec::new();
        }

        self.nodes.insert(new_node.to_string());
        self.ring.add_node(new_node);

        let mut transfer_keys = Vec::new();
        for key in self.store.keys() {
            let owners = self.ring.nodes_for(&key);
            let new_node_owns = owners.iter().any(|owner| owner == new_node);
            let local_owns = owners.iter().any(|owner| owner == &self.node_id);
            if new_node_owns && !local_owns {
                self.pending_transfers
                    .entry(new_node.to_string())
                    .or_default()
                    .insert(key.clone());
                transfer_keys.push(key);
            }
        }

        transfer_keys
    }

    pub fn pending_for(&self, target: &str) -> Option<&HashSet<String>> {
        self.pending_transfers.get(target)
    }

    /// Confirmed physical delivery of one key: drop it from the local store
    /// and from the target's pending set.
    pub fn complete_transfer(&mut self, target: &str, key: &str) -> Option<KeyRecord> {
        if let Some(pending) = self.pending_transfers.get_mut(target) {
            pending.remove(key);
            if pending.is_empty() {
                self.pending_transfers.remove(target);
            }
        }
        self.store.remove(key)
    }

    /// Recover to a known-good empty state: no keys, no pending transfers,
    /// singleton ring.
    pub fn reset(&mut self) {
        self.store.clear();
        self.pending_transfers.clear();
        self.nodes.clear();
        self.nodes.insert(self.node_id.clone());

        let mut ring =
            HashRing::with_hash(self.ring.vnodes(), self.ring.replicas(), content_position);
        ring.add_node(&self.node_id);
        self.ring = ring;
    }

    pub fn export_ring(&self) -> RingMetadata {
        self.ring.export_metadata()
    }

    /// Rebuild a manager from exported topology. Storage and pending state
    /// start empty; a freshly joining node has no legacy data. The local node
    /// is added to the ring under the default virtual-node count when the
    /// metadata does not already name it (the first node of a cluster joins
    /// against an empty export).
    pub fn reconstruct(
        metadata: &RingMetadata,
        node_id: impl Into<String>,
        vnodes: usize,
        replicas: usize,
    ) -> Self {
        let node_id = node_id.into();
        let mut ring = HashRing::reconstruct(metadata, vnodes, replicas, content_position);
        if !ring.contains_node(&node_id) {
            ring.add_node(&node_id);
        }

        let mut nodes: HashSet<String> = metadata.physical_nodes.keys().cloned().collect();
        nodes.insert(node_id.clone());

        Self {
            node_id,
            nodes,
            ring,
            store: KeyValueStore::new(),
            pending_transfers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const VNODES: usize = 5;
    const REPLICAS: usize = 3;

    fn manager_with_members(node_id: &str, others: &[&str]) -> KeyManager {
        let mut manager = KeyManager::new(node_id, VNODES, REPLICAS);
        for other in others {
            manager.add_node(other);
        }
        manager
    }

    fn record(key: &str) -> KeyRecord {
        KeyRecord::new("alice", format!("/data/{}", key))
    }

    #[test]
    fn test_insert_and_get_on_singleton() {
        let mut manager = KeyManager::new("node1", VNODES, REPLICAS);
        assert_eq!(manager.insert("key1", record("key1")), KeyPlacement::Stored);
        assert_eq!(manager.get("key1").unwrap().owner, "alice");
    }

    #[test]
    fn test_insert_rejected_when_not_responsible() {
        let mut manager = manager_with_members(
            "node1",
            &["node2", "node3", "node4", "node5", "node6", "node7"],
        );

        let mut rejected = None;
        for index in 0..200 {
            let key = format!("key{}", index);
            match manager.insert(&key, record(&key)) {
                KeyPlacement::Stored => {}
                KeyPlacement::NotResponsible(owners) => {
                    rejected = Some((key, owners));
                    break;
                }
            }
        }

        let (key, owners) = rejected.expect("some key must fall outside node1's ownership");
        assert_eq!(owners.len(), REPLICAS);
        assert!(!owners.contains(&"node1".to_string()));
        assert!(manager.get(&key).is_none());
    }

    #[test]
    fn test_get_and_remove_skip_ownership_checks() {
        let mut manager = manager_with_members(
            "node1",
            &["node2", "node3", "node4", "node5", "node6", "node7"],
        );

        // A key this node does not own can still be held locally, which is
        // exactly the in-flight-transfer situation.
        manager.accept("foreign", record("foreign"));
        assert!(manager.get("foreign").is_some());
        assert!(manager.remove("foreign").is_some());
        assert!(manager.get("foreign").is_none());
    }

    #[test]
    fn test_list_local_keys() {
        let mut manager = KeyManager::new("node1", VNODES, REPLICAS);
        for key in ["key4", "key5", "key6"] {
            manager.insert(key, record(key));
        }
        let keys: HashSet<String> = manager.local_keys().into_iter().collect();
        let expected: HashSet<String> =
            ["key4", "key5", "key6"].iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_duplicate_add_node_is_idempotent() {
        let mut manager = KeyManager::new("node1", VNODES, REPLICAS);
        for index in 0..20 {
            let key = format!("key{}", index);
            manager.accept(&key, record(&key));
        }

        let first = manager.add_node("node2");
        let members_after_first = manager.known_nodes();
        let ring_len_after_first = manager.ring().len();

        let second = manager.add_node("node2");
        assert!(second.is_empty());
        assert_eq!(manager.known_nodes(), members_after_first);
        assert_eq!(manager.ring().len(), ring_len_after_first);

        // Whatever the first call marked pending is untouched by the second.
        match manager.pending_for("node2") {
            Some(pending) => assert_eq!(pending.len(), first.len()),
            None => assert!(first.is_empty()),
        }
    }

    #[test]
    fn test_ownership_conservation_on_join() {
        let mut manager = manager_with_members("node1", &["node2", "node3"]);
        let mut original: HashSet<String> = HashSet::new();
        for index in 0..100 {
            let key = format!("key{}", index);
            manager.accept(&key, record(&key));
            original.insert(key);
        }

        let transferred: HashSet<String> = manager.add_node("node4").into_iter().collect();

        for key in &original {
            let owners = manager.owners_for(key);
            let new_owns = owners.contains(&"node4".to_string());
            let local_owns = owners.contains(&"node1".to_string());
            assert_eq!(
                transferred.contains(key),
                new_owns && !local_owns,
                "key {} misclassified",
                key
            );
        }

        // Nothing dropped, nothing duplicated: every original key is still
        // held locally, and the transfer set is a subset of it.
        let retained: HashSet<String> = manager.local_keys().into_iter().collect();
        assert_eq!(retained, original);
        assert!(transferred.is_subset(&original));
        assert_eq!(
            manager.pending_for("node4").map(|p| p.len()).unwrap_or(0),
            transferred.len()
        );
    }

    #[test]
    fn test_transfers_appear_only_once_ownership_moves() {
        let mut manager = KeyManager::new("node1", VNODES, REPLICAS);
        for index in 0..100 {
            let key = format!("key{}", index);
            manager.accept(&key, record(&key));
        }

        // With replication factor 3, the first two extra members still leave
        // this node in every key's owner set.
        let to_node5 = manager.add_node("node5");
        let to_node6 = manager.add_node("node6");
        let to_node7 = manager.add_node("node7");

        assert!(to_node5.is_empty());
        assert!(to_node6.is_empty());
        assert!(!to_node7.is_empty());
        assert_eq!(
            manager.pending_for("node7").unwrap(),
            &to_node7.iter().cloned().collect::<HashSet<String>>()
        );
    }

    #[test]
    fn test_complete_transfer_drops_key_and_pending_entry() {
        let mut manager = KeyManager::new("node1", VNODES, REPLICAS);
        for index in 0..100 {
            let key = format!("key{}", index);
            manager.accept(&key, record(&key));
        }
        manager.add_node("node5");
        manager.add_node("node6");
        let transferred = manager.add_node("node7");
        assert!(!transferred.is_empty());

        for key in &transferred {
            assert!(manager.complete_transfer("node7", key).is_some());
            assert!(manager.get(key).is_none());
        }
        assert!(manager.pending_for("node7").is_none());
    }

    #[test]
    fn test_reset_returns_to_singleton() {
        let mut manager = manager_with_members("node1", &["node2", "node3"]);
        manager.accept("key9", record("key9"));

        manager.reset();

        assert!(manager.get("key9").is_none());
        assert!(manager.local_keys().is_empty());
        assert_eq!(manager.known_nodes(), vec!["node1".to_string()]);
        assert_eq!(manager.ring().physical_nodes(), vec!["node1".to_string()]);
    }

    #[test]
    fn test_export_ring_metadata() {
        let manager = KeyManager::new("node1", VNODES, REPLICAS);
        let metadata = manager.export_ring();
        assert_eq!(metadata.physical_nodes.len(), 1);
        assert_eq!(metadata.physical_nodes.get("node1"), Some(&VNODES));
    }

    #[test]
    fn test_reconstruct_reproduces_topology_with_empty_state() {
        let mut manager = manager_with_members("node1", &["node2"]);
        manager.accept("key10", record("key10"));
        let metadata = manager.export_ring();

        let rebuilt = KeyManager::reconstruct(&metadata, "node1", VNODES, REPLICAS);

        assert!(rebuilt.get("key10").is_none());
        assert!(rebuilt.local_keys().is_empty());
        assert!(rebuilt.pending_for("node2").is_none());
        assert_eq!(rebuilt.node_id(), "node1");
        assert_eq!(rebuilt.ring().physical_nodes(), manager.ring().physical_nodes());
        for node in manager.ring().physical_nodes() {
            assert_eq!(
                rebuilt.ring().virtual_positions(&node),
                manager.ring().virtual_positions(&node)
            );
        }
    }

    #[test]
    fn test_reconstruct_from_empty_export_bootstraps_a_singleton() {
        // The first node of a cluster joins against an empty topology and
        // must still end up owning the whole keyspace.
        let rebuilt = KeyManager::reconstruct(&RingMetadata::default(), "node1", VNODES, REPLICAS);
        assert_eq!(rebuilt.ring().physical_nodes(), vec!["node1".to_string()]);
        assert_eq!(rebuilt.owners_for("anything"), vec!["node1".to_string()]);
    }

    #[test]
    fn test_hundred_keys_assigned_to_primaries_exactly_once() {
        let node_ids = ["n1", "n2", "n3"];
        let mut managers: Vec<KeyManager> = node_ids
            .iter()
            .map(|id| {
                let mut manager = KeyManager::new(*id, 5, 3);
                for other in &node_ids {
                    manager.add_node(other);
                }
                manager
            })
            .collect();

        for index in 0..100 {
            let key = format!("blob-{}", index);
            let primary = managers[0]
                .ring()
                .primary_node(&key)
                .expect("non-empty ring")
                .to_string();
            // Every manager resolves the same primary.
            for manager in &managers {
                assert_eq!(manager.ring().primary_node(&key), Some(primary.as_str()));
            }
            let holder = managers
                .iter_mut()
                .find(|manager| manager.node_id() == primary)
                .unwrap();
            holder.accept(&key, record(&key));
        }

        let total: usize = managers.iter().map(|m| m.local_keys().len()).sum();
        assert_eq!(total, 100);
        for index in 0..100 {
            let key = format!("blob-{}", index);
            let holders = managers.iter().filter(|m| m.get(&key).is_some()).count();
            assert_eq!(holders, 1, "key {} held by {} nodes", key, holders);
        }
    }

    #[test]
    fn test_mutual_join_partitions_the_key_set() {
        let mut manager_a = KeyManager::new("nodeA", 5, 1);
        let mut manager_b = KeyManager::new("nodeB", 5, 1);

        let keys: Vec<String> = (0..10).map(|i| format!("key{}", i)).collect();
        for key in &keys {
            manager_a.accept(key, record(key));
            manager_b.accept(key, record(key));
        }

        let to_b: HashSet<String> = manager_a.add_node("nodeB").into_iter().collect();
        let to_a: HashSet<String> = manager_b.add_node("nodeA").into_iter().collect();

        // Both sides agree on ownership, so the transfer sets partition the
        // original key set.
        let union: HashSet<String> = to_b.union(&to_a).cloned().collect();
        assert_eq!(union.len(), keys.len());
        assert!(to_b.is_disjoint(&to_a));

        // Simulate delivery in both directions.
        for key in &to_b {
            let rec = manager_a.get(key).cloned().unwrap();
            manager_b.accept(key, rec);
            manager_a.complete_transfer("nodeB", key);
        }
        for key in &to_a {
            let rec = manager_b.get(key).cloned().unwrap();
            manager_a.accept(key, rec);
            manager_b.complete_transfer("nodeA", key);
        }

        for key in &keys {
            let on_a = manager_a.get(key).is_some();
            let on_b = manager_b.get(key).is_some();
            assert!(
                on_a ^ on_b,
                "key {} should end on exactly one side (a={}, b={})",
                key,
                on_a,
                on_b
            );
        }
    }
}
