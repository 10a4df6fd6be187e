//! Hashing utilities for deterministic seeds.

use sha2::{Digest, Sha256};

/// Derives a 32-byte seed from an ordered list of parts.
///
/// Each part is length-prefixed before hashing so that `["ab", "c"]` and
/// `["a", "bc"]` produce different seeds.
pub fn derive_seed(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    seed
}
