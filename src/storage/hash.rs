//! FNV-1a hashing for shard selection.
//!
//! The hash only has to spread keys evenly across shards and be stable for
//! the lifetime of the process. It is not collision resistant and must not
//! be used for anything exposed to hash-flooding concerns.

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Computes the 32-bit FNV-1a hash of `key`.
///
/// # Example
///
/// ```
/// use kvcache::storage::hash::fnv1a_32;
///
/// assert_eq!(fnv1a_32(b""), 2_166_136_261);
/// assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
/// ```
#[inline]
pub fn fnv1a_32(key: &[u8]) -> u32 {
    key.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
