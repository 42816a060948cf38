mod blob_store;

pub use blob_store::{BlobStore, FsBlobStore};

use sha2::{Digest, Sha256};

/// Content key for a blob: the hex SHA-256 of its bytes. Clients usually
/// compute this themselves; it is also how content-addressed keys find their
/// own position on the ring.
pub fn compute_key(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_key_is_hex_sha256() {
        let key = compute_key(b"hello");
        assert_eq!(key.len(), 64);
        assert_eq!(
            key,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
