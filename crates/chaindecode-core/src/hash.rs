//! Dispatch-hash computation.
//!
//! The dispatch key of an event is the keccak256 hash of its canonical
//! signature string, e.g.:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef
//!
//! Functions use the first 4 bytes of the same hash (the selector).

use tiny_keccak::{Hasher, Keccak};

/// keccak256 of arbitrary bytes.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(bytes);
    hasher.finalize(&mut output);
    output
}

/// Full 32-byte event dispatch hash (topic0) of a canonical signature.
/// Input: `"EventName(type1,type2,...)"` — no `event` prefix, no `indexed`
/// markers, no parameter names.
pub fn event_hash(canonical_signature: &str) -> [u8; 32] {
    keccak256(canonical_signature.as_bytes())
}

/// 4-byte function selector of a canonical signature.
/// Input: `"functionName(type1,type2,...)"` — the `returns` clause is not
/// part of the hashed form.
pub fn function_selector(canonical_signature: &str) -> [u8; 4] {
    let digest = keccak256(canonical_signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}
