//! The map's external hash function: djb2 over raw bytes
//! (<http://www.cse.yorku.ca/~oz/hash.html>).
//!
//! Deliberately a fixed pure function rather than a keyed hasher: every
//! map entry stores its hash once at insert time and every rehash reuses
//! it, so the function must be stable for a given input. Collisions are
//! expected and resolved by full key comparison in the bucket chains.

/// Hash a byte string. Deterministic; equal inputs always hash equal.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h: u64 = 5381;
    for &b in bytes {
        // h * 33 + b
        h = (h << 5).wrapping_add(h).wrapping_add(b as u64);
    }
    h
}
