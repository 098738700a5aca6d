use alloy_primitives::{keccak256, B256};
use bridge_core::Salt;

/// Keccak-256 hash (32 bytes).
pub type Hash = B256;

/// Hash arbitrary data using Keccak-256.
pub fn keccak(data: &[u8]) -> Hash {
    keccak256(data)
}

/// Hash `salt ‖ UTF8(value)`.
///
/// This is Solidity's `keccak256(abi.encodePacked(bytes32 salt, string value))`:
/// the 32 salt bytes followed by the raw string bytes, with no length prefix
/// or padding.
pub fn salted_hash(salt: &Salt, value: &str) -> Hash {
    let mut input = Vec::with_capacity(32 + value.len());
    input.extend_from_slice(salt.as_bytes());
    input.extend_from_slice(value.as_bytes());
    keccak(&input)
}
