//! Shared parameter decoding and column rendering.
//!
//! Both row decoders produce the same three derived columns per parameter
//! set: a JSON array of keys, a JSON array of stringified values, and a JSON
//! array of `{name, index, value_type, value}` objects.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use chaindecode_core::error::DecodeError;
use chaindecode_core::signature::ResolvedParam;
use chaindecode_core::value::ParamValue;

/// One decoded parameter with its rendered type tag.
#[derive(Debug, Clone)]
pub struct DecodedParam {
    /// Declared name; may be empty.
    pub name: String,
    /// Zero-based declaration position.
    pub index: usize,
    /// Canonical Solidity type, suffixed `_hash` for hashed indexed values.
    pub value_type: String,
    pub value: ParamValue,
}

/// The three derived output column values for one parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamColumns {
    pub keys: String,
    pub values: String,
    pub json: String,
}

impl ParamColumns {
    /// The representation of a parameter set that decoded to nothing.
    pub fn empty() -> Self {
        Self {
            keys: "[]".into(),
            values: "[]".into(),
            json: "[]".into(),
        }
    }
}

fn json_error(e: serde_json::Error) -> DecodeError {
    DecodeError::MalformedPayload {
        reason: format!("failed to serialize decoded row: {e}"),
    }
}

/// Render decoded parameters into the derived columns.
pub fn render_columns(params: &[DecodedParam]) -> Result<ParamColumns, DecodeError> {
    let keys: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    let values: Vec<String> = params.iter().map(|p| p.value.to_string()).collect();
    let entries: Vec<serde_json::Value> = params
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "index": p.index,
                "value_type": p.value_type,
                "value": p.value.to_string(),
            })
        })
        .collect();
    Ok(ParamColumns {
        keys: serde_json::to_string(&keys).map_err(json_error)?,
        values: serde_json::to_string(&values).map_err(json_error)?,
        json: serde_json::to_string(&entries).map_err(json_error)?,
    })
}

/// ABI-decode `data` as the tuple of the given parameter specs, in order.
///
/// An empty spec list decodes to an empty value list regardless of `data`.
pub fn decode_tuple(
    specs: &[ResolvedParam],
    data: &[u8],
) -> Result<Vec<ParamValue>, DecodeError> {
    if specs.is_empty() {
        return Ok(Vec::new());
    }
    let tuple = DynSolType::Tuple(specs.iter().map(|s| s.ty.clone()).collect());
    let decoded = tuple
        .abi_decode_sequence(data)
        .map_err(DecodeError::from_alloy)?;
    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    if values.len() != specs.len() {
        return Err(DecodeError::LengthMismatch {
            reason: format!(
                "expected {} tuple elements, decoded {}",
                specs.len(),
                values.len()
            ),
        });
    }
    Ok(values.into_iter().map(ParamValue::normalize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaindecode_core::signature;

    fn specs(sig: &str) -> Vec<ResolvedParam> {
        let function = signature::parse_function_signature(sig).unwrap();
        signature::resolve_function_params(&function.inputs).unwrap()
    }

    #[test]
    fn decode_static_tuple() {
        let specs = specs("function f(address to, uint256 amount)");
        let mut data = vec![0u8; 64];
        data[12..32].copy_from_slice(&[0x11u8; 20]);
        data[56..64].copy_from_slice(&1_000_000u64.to_be_bytes());
        let values = decode_tuple(&specs, &data).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].to_string(), "1000000");
    }

    #[test]
    fn decode_dynamic_string() {
        let specs = specs("function f(string note)");
        // offset word + length word + padded payload
        let mut data = vec![0u8; 96];
        data[31] = 0x20;
        data[63] = 5;
        data[64..69].copy_from_slice(b"hello");
        let values = decode_tuple(&specs, &data).unwrap();
        assert_eq!(values[0].to_string(), "hello");
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let specs = specs("function f(uint256 a)");
        assert!(decode_tuple(&specs, &[0u8; 16]).is_err());
    }

    #[test]
    fn empty_specs_ignore_data() {
        assert!(decode_tuple(&[], &[1, 2, 3]).unwrap().is_empty());
    }

    #[test]
    fn render_columns_shapes() {
        let params = vec![DecodedParam {
            name: "value".into(),
            index: 0,
            value_type: "uint256".into(),
            value: ParamValue::Uint(alloy_primitives::U256::from(7u64)),
        }];
        let cols = render_columns(&params).unwrap();
        assert_eq!(cols.keys, r#"["value"]"#);
        assert_eq!(cols.values, r#"["7"]"#);
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&cols.json).unwrap();
        assert_eq!(parsed[0]["value_type"], "uint256");
        assert_eq!(parsed[0]["index"], 0);
        assert_eq!(parsed[0]["value"], "7");
    }
}
