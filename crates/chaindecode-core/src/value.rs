//! The decoded value model.
//!
//! Every parameter decoded from a log topic, a log data payload, or a trace
//! input/output tuple is normalized into a [`ParamValue`]. Consumers only
//! ever see `ParamValue` — the alloy decoding types never escape the codec.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, I256, U256};
use std::fmt;

/// A decoded, normalized Solidity value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// 20-byte EVM address, displayed EIP-55 checksummed.
    Address(Address),
    /// Unsigned integer up to 256 bits. Displayed base-10, never truncated.
    Uint(U256),
    /// Signed integer up to 256 bits. Displayed base-10, never truncated.
    Int(I256),
    Bool(bool),
    /// Variable-length byte array, displayed as 0x-prefixed hex.
    Bytes(Vec<u8>),
    /// `bytes1`..`bytes32`, displayed as 0x-prefixed hex.
    FixedBytes(Vec<u8>),
    /// UTF-8 string, displayed verbatim.
    Str(String),
    Array(Vec<ParamValue>),
    Tuple(Vec<ParamValue>),
}

impl ParamValue {
    /// Convert a decoded alloy `DynSolValue` into a `ParamValue`.
    pub fn normalize(val: DynSolValue) -> Self {
        match val {
            DynSolValue::Bool(b) => ParamValue::Bool(b),
            DynSolValue::Int(i, _bits) => ParamValue::Int(i),
            DynSolValue::Uint(u, _bits) => ParamValue::Uint(u),
            DynSolValue::FixedBytes(word, size) => {
                ParamValue::FixedBytes(word[..size].to_vec())
            }
            DynSolValue::Bytes(b) => ParamValue::Bytes(b),
            DynSolValue::String(s) => ParamValue::Str(s),
            DynSolValue::Address(a) => ParamValue::Address(a),
            DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
                ParamValue::Array(vals.into_iter().map(ParamValue::normalize).collect())
            }
            DynSolValue::Tuple(vals) => {
                ParamValue::Tuple(vals.into_iter().map(ParamValue::normalize).collect())
            }
            // Function selectors and any feature-gated variants carry raw bytes.
            other => ParamValue::Bytes(other.abi_encode()),
        }
    }

    /// JSON projection: scalars render as strings, composites as JSON arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Array(vals) | ParamValue::Tuple(vals) => {
                serde_json::Value::Array(vals.iter().map(ParamValue::to_json).collect())
            }
            scalar => serde_json::Value::String(scalar.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // alloy's Display for Address is the EIP-55 checksummed form.
            ParamValue::Address(a) => write!(f, "{a}"),
            ParamValue::Uint(u) => write!(f, "{u}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Bytes(b) | ParamValue::FixedBytes(b) => {
                write!(f, "0x{}", hex::encode(b))
            }
            ParamValue::Str(s) => write!(f, "{s}"),
            composite @ (ParamValue::Array(_) | ParamValue::Tuple(_)) => {
                write!(f, "{}", composite.to_json())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint256_full_range_display() {
        let v = ParamValue::Uint(U256::MAX);
        assert_eq!(
            v.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn int_negative_display() {
        let v = ParamValue::Int(I256::try_from(-42i64).unwrap());
        assert_eq!(v.to_string(), "-42");
    }

    #[test]
    fn address_display_is_checksummed() {
        let a: Address = "0xeedff72a683058f8ff531e8c98575f920430fdc5".parse().unwrap();
        assert_eq!(
            ParamValue::Address(a).to_string(),
            "0xeEDfF72A683058F8FF531e8c98575f920430FdC5"
        );
    }

    #[test]
    fn bool_display() {
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn bytes_display() {
        assert_eq!(
            ParamValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef]).to_string(),
            "0xdeadbeef"
        );
    }

    #[test]
    fn array_renders_as_json() {
        let v = ParamValue::Array(vec![
            ParamValue::Uint(U256::from(1u64)),
            ParamValue::Uint(U256::from(2u64)),
        ]);
        assert_eq!(v.to_string(), r#"["1","2"]"#);
    }

    #[test]
    fn normalize_fixed_bytes_truncates_to_size() {
        let mut word = [0u8; 32];
        word[0] = 0xab;
        word[1] = 0xcd;
        let v = ParamValue::normalize(DynSolValue::FixedBytes(word.into(), 2));
        assert_eq!(v, ParamValue::FixedBytes(vec![0xab, 0xcd]));
    }

    #[test]
    fn normalize_uint_keeps_full_width() {
        let big = (U256::from(1u64) << 200) + U256::from(7u64);
        let v = ParamValue::normalize(DynSolValue::Uint(big, 256));
        assert_eq!(v, ParamValue::Uint(big));
    }
}
