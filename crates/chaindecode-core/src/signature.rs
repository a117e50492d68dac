//! Canonical signature stringification and parsing.
//!
//! Two string forms exist for every catalog entry:
//!
//! - the **full signature**, which is what the catalog stores and must
//!   round-trip through parsing, e.g.
//!   `event Transfer(address indexed from, address indexed to, uint256 value)`
//!   or `function transfer(address to, uint256 amount) returns (bool)`;
//! - the **canonical signature**, the hashable form with `uint`/`int`
//!   expanded, tuples flattened to `(…)`, and names/markers stripped, e.g.
//!   `Transfer(address,address,uint256)`.

use crate::error::SignatureError;
use crate::hash;
use alloy_dyn_abi::DynSolType;
use alloy_json_abi::{Event, Function, StateMutability};

/// A signature parameter resolved to its decodable type.
#[derive(Debug, Clone)]
pub struct ResolvedParam {
    /// Declared name; may be empty.
    pub name: String,
    /// Canonical Solidity type string, e.g. `uint256` or `(address,uint96)[]`.
    pub type_str: String,
    /// The resolved dynamic type used for ABI decoding.
    pub ty: DynSolType,
    /// Events only: whether the parameter lives in a topic.
    pub indexed: bool,
}

/// Returns `true` for elementary value types — the types whose ABI encoding
/// is a single 32-byte word. Indexed event parameters of any other type are
/// stored as the keccak256 of their encoding, not the value itself.
pub fn is_value_type(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::Address
            | DynSolType::Bool
            | DynSolType::Int(_)
            | DynSolType::Uint(_)
            | DynSolType::FixedBytes(_)
            | DynSolType::Function
    )
}

/// Canonical (hashable) signature of an event.
pub fn event_canonical_signature(event: &Event) -> String {
    let types: Vec<String> = event
        .inputs
        .iter()
        .map(|p| p.selector_type().to_string())
        .collect();
    format!("{}({})", event.name, types.join(","))
}

/// Canonical (hashable) signature of a function. The `returns` clause is not
/// part of the hashed form.
pub fn function_canonical_signature(function: &Function) -> String {
    let types: Vec<String> = function
        .inputs
        .iter()
        .map(|p| p.selector_type().to_string())
        .collect();
    format!("{}({})", function.name, types.join(","))
}

/// 32-byte topic0 of an event.
pub fn event_topic0(event: &Event) -> [u8; 32] {
    hash::event_hash(&event_canonical_signature(event))
}

/// 4-byte selector of a function.
pub fn function_selector(function: &Function) -> [u8; 4] {
    hash::function_selector(&function_canonical_signature(function))
}

/// Full signature of an event:
/// `event Name(type [indexed] [name], …)`.
pub fn event_full_signature(event: &Event) -> String {
    let params: Vec<String> = event
        .inputs
        .iter()
        .map(|p| {
            let mut s = p.selector_type().to_string();
            if p.indexed {
                s.push_str(" indexed");
            }
            if !p.name.is_empty() {
                s.push(' ');
                s.push_str(&p.name);
            }
            s
        })
        .collect();
    format!("event {}({})", event.name, params.join(", "))
}

/// Full signature of a function:
/// `function name(type [name], …) returns (type [name], …)` — the `returns`
/// clause is omitted when the function declares no outputs.
pub fn function_full_signature(function: &Function) -> String {
    let render = |params: &[alloy_json_abi::Param]| -> String {
        params
            .iter()
            .map(|p| {
                let mut s = p.selector_type().to_string();
                if !p.name.is_empty() {
                    s.push(' ');
                    s.push_str(&p.name);
                }
                s
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = format!("function {}({})", function.name, render(&function.inputs));
    if !function.outputs.is_empty() {
        out.push_str(&format!(" returns ({})", render(&function.outputs)));
    }
    out
}

/// Parse an event full signature back into an [`Event`].
///
/// Accepts the form produced by [`event_full_signature`], with or without
/// the leading `event ` keyword.
pub fn parse_event_signature(full: &str) -> Result<Event, SignatureError> {
    let stripped = full.trim().strip_prefix("event ").unwrap_or(full.trim());
    Event::parse(stripped)
        .or_else(|_| Event::parse(full.trim()))
        .map_err(|e| SignatureError::Parse {
            signature: full.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a function full signature back into a [`Function`].
pub fn parse_function_signature(full: &str) -> Result<Function, SignatureError> {
    let stripped = full.trim().strip_prefix("function ").unwrap_or(full.trim());
    let mut function = Function::parse(stripped)
        .or_else(|_| Function::parse(full.trim()))
        .map_err(|e| SignatureError::Parse {
            signature: full.to_string(),
            reason: e.to_string(),
        })?;
    // The textual form carries no mutability; normalize so re-rendered
    // signatures do not depend on parser defaults.
    function.state_mutability = StateMutability::NonPayable;
    Ok(function)
}

/// Resolve an event's parameters to decodable types, declaration order.
pub fn resolve_event_params(event: &Event) -> Result<Vec<ResolvedParam>, SignatureError> {
    event
        .inputs
        .iter()
        .map(|p| {
            let type_str = p.selector_type().to_string();
            let ty = DynSolType::parse(&type_str)
                .map_err(|_| SignatureError::UnknownType { ty: type_str.clone() })?;
            Ok(ResolvedParam {
                name: p.name.clone(),
                type_str,
                ty,
                indexed: p.indexed,
            })
        })
        .collect()
}

/// Resolve a function parameter list (inputs or outputs) to decodable types.
pub fn resolve_function_params(
    params: &[alloy_json_abi::Param],
) -> Result<Vec<ResolvedParam>, SignatureError> {
    params
        .iter()
        .map(|p| {
            let type_str = p.selector_type().to_string();
            let ty = DynSolType::parse(&type_str)
                .map_err(|_| SignatureError::UnknownType { ty: type_str.clone() })?;
            Ok(ResolvedParam {
                name: p.name.clone(),
                type_str,
                ty,
                indexed: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_EVENT: &str =
        "event Transfer(address indexed from, address indexed to, uint256 value)";

    #[test]
    fn event_signature_round_trips() {
        let event = parse_event_signature(TRANSFER_EVENT).unwrap();
        assert_eq!(event.name, "Transfer");
        assert_eq!(event_full_signature(&event), TRANSFER_EVENT);
    }

    #[test]
    fn event_canonical_strips_markers_and_names() {
        let event = parse_event_signature(TRANSFER_EVENT).unwrap();
        assert_eq!(
            event_canonical_signature(&event),
            "Transfer(address,address,uint256)"
        );
    }

    #[test]
    fn event_topic0_matches_known_hash() {
        let event = parse_event_signature(TRANSFER_EVENT).unwrap();
        assert_eq!(
            hex::encode(event_topic0(&event)),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn function_signature_round_trips() {
        let full = "function transfer(address to, uint256 amount) returns (bool)";
        let function = parse_function_signature(full).unwrap();
        assert_eq!(function_full_signature(&function), full);
        assert_eq!(
            function_canonical_signature(&function),
            "transfer(address,uint256)"
        );
        assert_eq!(hex::encode(function_selector(&function)), "a9059cbb");
    }

    #[test]
    fn function_without_outputs_omits_returns() {
        let full = "function deposit(uint256 amount)";
        let function = parse_function_signature(full).unwrap();
        assert_eq!(function_full_signature(&function), full);
    }

    #[test]
    fn nameless_parameters_render_as_bare_types() {
        let full = "function transfer(address, uint256) returns (bool)";
        let function = parse_function_signature(full).unwrap();
        assert_eq!(
            function_full_signature(&function),
            "function transfer(address, uint256) returns (bool)"
        );
    }

    #[test]
    fn resolve_event_params_declaration_order() {
        let event = parse_event_signature(TRANSFER_EVENT).unwrap();
        let params = resolve_event_params(&event).unwrap();
        assert_eq!(params.len(), 3);
        assert!(params[0].indexed && params[1].indexed && !params[2].indexed);
        assert_eq!(params[2].name, "value");
        assert_eq!(params[2].type_str, "uint256");
    }

    #[test]
    fn value_type_boundary() {
        assert!(is_value_type(&DynSolType::Uint(256)));
        assert!(is_value_type(&DynSolType::FixedBytes(32)));
        assert!(is_value_type(&DynSolType::Address));
        assert!(!is_value_type(&DynSolType::String));
        assert!(!is_value_type(&DynSolType::Bytes));
        assert!(!is_value_type(&DynSolType::Array(Box::new(DynSolType::Uint(8)))));
        assert!(!is_value_type(&DynSolType::Tuple(vec![DynSolType::Bool])));
    }
}
