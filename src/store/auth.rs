//! Salted password digests for the demo auth gateway. This is a stand-in
//! for a hosted identity provider, not a hardened credential store.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::utils::to_hex;

pub(super) fn new_digest(password: &str) -> String {
    let salt: [u8; 16] = rand::rng().random();
    let salt_hex = to_hex(&salt);
    let hash = hash_with_salt(&salt_hex, password);
    format!("{salt_hex}${hash}")
}

pub(super) fn verify_digest(digest: &str, password: &str) -> bool {
    match digest.split_once('$') {
        Some((salt_hex, hash)) => hash_with_salt(salt_hex, password) == hash,
        None => false,
    }
}

fn hash_with_salt(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_round_trip() {
        let digest = new_digest("hunter2");
        assert!(verify_digest(&digest, "hunter2"));
        assert!(!verify_digest(&digest, "hunter3"));
    }

    #[test]
    fn digests_are_salted() {
        assert_ne!(new_digest("same"), new_digest("same"));
    }

    #[test]
    fn malformed_digest_never_verifies() {
        assert!(!verify_digest("no-separator", "anything"));
    }
}
