//! Per-row event decoding.
//!
//! Indexed parameters are consumed from `topic1..topic3` in declaration
//! order; the remaining parameters decode from `data` as an ABI-encoded
//! tuple.
//!
//! # Indexed-parameter coercion
//! - **Value types** (uint, int, bool, address, bytes1–bytes32): padded to
//!   32 bytes, stored directly — the topic word is ABI-decoded back to the
//!   value.
//! - **Reference types** (string, bytes, arrays, tuples): the topic word
//!   holds the keccak256 of the ABI encoding — the original value is
//!   unrecoverable. The raw 32-byte hash is surfaced and the JSON
//!   `value_type` is suffixed `_hash`.

use crate::params::{self, DecodedParam, ParamColumns};
use chaindecode_abi::AbiItem;
use chaindecode_core::error::DecodeError;
use chaindecode_core::signature::{ResolvedParam, is_value_type};
use chaindecode_core::value::ParamValue;

/// The byte columns of one raw log row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLogRow<'a> {
    pub topics: [Option<&'a [u8]>; 4],
    pub data: Option<&'a [u8]>,
}

/// Decode one raw log row against a resolved event item.
pub fn decode_log(
    row: &RawLogRow<'_>,
    item: &AbiItem,
    params: &[ResolvedParam],
) -> Result<ParamColumns, DecodeError> {
    if !item.anonymous {
        match row.topics[0] {
            Some(topic0) if topic0 == item.hash.as_slice() => {}
            Some(_) => {
                return Err(DecodeError::MalformedPayload {
                    reason: "topic0 does not match the event hash".into(),
                })
            }
            None => {
                return Err(DecodeError::LengthMismatch {
                    reason: "row has no topic0 for a non-anonymous event".into(),
                })
            }
        }
    }

    let indexed: Vec<&ResolvedParam> = params.iter().filter(|p| p.indexed).collect();
    if indexed.len() > 3 {
        return Err(DecodeError::LengthMismatch {
            reason: format!("event declares {} indexed parameters (max 3)", indexed.len()),
        });
    }
    let available = row.topics[1..].iter().filter(|t| t.is_some()).count();
    if available != indexed.len() {
        return Err(DecodeError::LengthMismatch {
            reason: format!(
                "event declares {} indexed parameters but row has {} topics",
                indexed.len(),
                available
            ),
        });
    }

    // Decode topics in declaration order.
    let mut topic_values = Vec::with_capacity(indexed.len());
    for (slot, spec) in indexed.iter().enumerate() {
        let topic = row.topics[1 + slot].ok_or_else(|| DecodeError::LengthMismatch {
            reason: format!("topic{} is null", 1 + slot),
        })?;
        if topic.len() != 32 {
            return Err(DecodeError::LengthMismatch {
                reason: format!("topic{} is {} bytes, expected 32", 1 + slot, topic.len()),
            });
        }
        if is_value_type(&spec.ty) {
            let value = spec
                .ty
                .abi_decode(topic)
                .map_err(DecodeError::from_alloy)?;
            topic_values.push((ParamValue::normalize(value), spec.type_str.clone()));
        } else {
            topic_values.push((
                ParamValue::FixedBytes(topic.to_vec()),
                format!("{}_hash", spec.type_str),
            ));
        }
    }

    // Decode the non-indexed tuple from `data`.
    let body_specs: Vec<ResolvedParam> =
        params.iter().filter(|p| !p.indexed).cloned().collect();
    let body_values = params::decode_tuple(&body_specs, row.data.unwrap_or_default())?;

    // Stitch back into declaration order.
    let mut topic_iter = topic_values.into_iter();
    let mut body_iter = body_values.into_iter();
    let mut decoded = Vec::with_capacity(params.len());
    for (index, spec) in params.iter().enumerate() {
        let (value, value_type) = if spec.indexed {
            topic_iter.next().ok_or_else(|| DecodeError::LengthMismatch {
                reason: "indexed parameter count drifted during decode".into(),
            })?
        } else {
            let value = body_iter.next().ok_or_else(|| DecodeError::LengthMismatch {
                reason: "data parameter count drifted during decode".into(),
            })?;
            (value, spec.type_str.clone())
        };
        decoded.push(DecodedParam {
            name: spec.name.clone(),
            index,
            value_type,
            value,
        });
    }

    params::render_columns(&decoded)
}
