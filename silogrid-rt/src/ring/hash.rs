//! Ring key hashing.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use crc32fast::Hasher;

// Layer 3: Internal module imports
// (none)

/// Hash arbitrary bytes to a 32-bit ring position.
///
/// Uses CRC32, hardware-accelerated where the CPU supports it with a
/// software fallback otherwise. Not cryptographic; the only requirements
/// here are speed and stable distribution across processes.
pub fn ring_hash(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Hash a UTF-8 key to a 32-bit ring position.
pub fn ring_hash_str(key: &str) -> u32 {
    ring_hash(key.as_bytes())
}
