use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;

/// Ownership metadata for one locally-held key: who uploaded it and where the
/// blob bytes live.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub owner: String,
    pub location: PathBuf,
    pub stored_at: DateTime<Utc>,
}

impl KeyRecord {
    pub fn new(owner: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            owner: owner.into(),
            location: location.into(),
            stored_at: Utc::now(),
        }
    }
}

/// In-memory key to ownership-record map. Last write wins on re-insertion.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: HashMap<String, KeyRecord>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, record: KeyRecord) {
        self.entries.insert(key.into(), record);
    }

    pub fn get(&self, key: &str) -> Option<&KeyRecord> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<KeyRecord> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut store = KeyValueStore::new();
        assert!(store.is_empty());

        store.insert("k1", KeyRecord::new("alice", "/data/k1"));
        assert!(store.contains("k1"));
        assert_eq!(store.get("k1").unwrap().owner, "alice");

        let removed = store.remove("k1").unwrap();
        assert_eq!(removed.location, PathBuf::from("/data/k1"));
        assert!(store.get("k1").is_none());
        assert!(store.remove("k1").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = KeyValueStore::new();
        store.insert("k1", KeyRecord::new("alice", "/data/old"));
        store.insert("k1", KeyRecord::new("bob", "/data/new"));

        assert_eq!(store.len(), 1);
        let record = store.get("k1").unwrap();
        assert_eq!(record.owner, "bob");
        assert_eq!(record.location, PathBuf::from("/data/new"));
    }

    #[test]
    fn test_keys_lists_everything() {
        let mut store = KeyValueStore::new();
        for key in ["k1", "k2", "k3"] {
            store.insert(key, KeyRecord::new("alice", format!("/data/{}", key)));
        }

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);

        store.clear();
        assert!(store.is_empty());
    }
}
