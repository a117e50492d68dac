//! Tolerant ABI JSON parsing.
//!
//! Input files are standard Ethereum ABI JSON arrays, named after the
//! contract they belong to (`0x<40 hex>.json`). Entries whose `type` is not
//! `event` or `function` (constructor, fallback, receive, error) are skipped;
//! an entry with an unresolvable Solidity type is an error for that entry
//! only.

use crate::error::CatalogError;
use crate::item::{AbiItem, ItemKind};
use alloy_json_abi::{Event, Function, StateMutability};
use alloy_primitives::Address;
use chaindecode_core::config::AbiReadMode;
use chaindecode_core::signature;
use std::path::Path;
use tracing::{debug, warn};

fn mutability_str(sm: StateMutability) -> &'static str {
    match sm {
        StateMutability::Pure => "pure",
        StateMutability::View => "view",
        StateMutability::NonPayable => "nonpayable",
        StateMutability::Payable => "payable",
    }
}

fn event_item(event: &Event, address: Address) -> Result<AbiItem, CatalogError> {
    // Resolving up front surfaces unknown types at parse time instead of at
    // decode time.
    let params = signature::resolve_event_params(event)?;
    let hash = signature::event_topic0(event).to_vec();
    let full_signature = signature::event_full_signature(event);
    let num_indexed = params.iter().filter(|p| p.indexed).count() as u32;
    let num_data = params.len() as u32 - num_indexed;
    let id = AbiItem::make_id(&hash, &full_signature, &address);
    Ok(AbiItem {
        kind: ItemKind::Event,
        address,
        hash,
        full_signature,
        name: event.name.clone(),
        anonymous: event.anonymous,
        state_mutability: String::new(),
        num_indexed_args: Some(num_indexed),
        num_data_args: Some(num_data),
        num_inputs: None,
        num_outputs: None,
        id,
    })
}

fn function_item(function: &Function, address: Address) -> Result<AbiItem, CatalogError> {
    signature::resolve_function_params(&function.inputs)?;
    signature::resolve_function_params(&function.outputs)?;
    let hash = signature::function_selector(function).to_vec();
    let full_signature = signature::function_full_signature(function);
    let id = AbiItem::make_id(&hash, &full_signature, &address);
    Ok(AbiItem {
        kind: ItemKind::Function,
        address,
        hash,
        full_signature,
        name: function.name.clone(),
        anonymous: false,
        state_mutability: mutability_str(function.state_mutability).to_string(),
        num_indexed_args: None,
        num_data_args: None,
        num_inputs: Some(function.inputs.len() as u32),
        num_outputs: Some(function.outputs.len() as u32),
        id,
    })
}

/// Parse an ABI JSON array into catalog items for one contract address.
///
/// Entries that fail to parse or resolve are dropped with a warning; the
/// rest of the array is unaffected.
pub fn parse_json(
    abi_json: &str,
    address: Address,
    mode: AbiReadMode,
) -> Result<Vec<AbiItem>, CatalogError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(abi_json).map_err(|e| CatalogError::InvalidAbiJson {
            reason: e.to_string(),
        })?;

    let mut items = Vec::new();
    for entry in entries {
        let kind = entry.get("type").and_then(|t| t.as_str()).unwrap_or("");
        match kind {
            "event" if mode != AbiReadMode::Functions => {
                let parsed: Result<Event, _> = serde_json::from_value(entry.clone());
                match parsed.map_err(|e| CatalogError::InvalidAbiJson {
                    reason: e.to_string(),
                }) {
                    Ok(event) => match event_item(&event, address) {
                        Ok(item) => items.push(item),
                        Err(e) => warn!(%address, error = %e, "skipping event entry"),
                    },
                    Err(e) => warn!(%address, error = %e, "skipping malformed event entry"),
                }
            }
            "function" if mode != AbiReadMode::Events => {
                let parsed: Result<Function, _> = serde_json::from_value(entry.clone());
                match parsed.map_err(|e| CatalogError::InvalidAbiJson {
                    reason: e.to_string(),
                }) {
                    Ok(function) => match function_item(&function, address) {
                        Ok(item) => items.push(item),
                        Err(e) => warn!(%address, error = %e, "skipping function entry"),
                    },
                    Err(e) => warn!(%address, error = %e, "skipping malformed function entry"),
                }
            }
            other => {
                debug!(entry_type = other, "skipping non-decodable ABI entry");
            }
        }
    }
    Ok(items)
}

/// Extract the contract address from an ABI file name (`0x<40 hex>.json`).
fn address_from_path(path: &Path) -> Result<Address, CatalogError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.parse::<Address>()
        .map_err(|_| CatalogError::InvalidAddress {
            value: stem.to_string(),
        })
}

/// Parse a single ABI file; the contract address is the file stem.
pub fn parse_file(path: &Path, mode: AbiReadMode) -> Result<Vec<AbiItem>, CatalogError> {
    let address = address_from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    parse_json(&text, address, mode)
}

/// Parse every `.json` file in a folder (non-recursive). Per-file failures
/// are logged and skipped; the remaining files still contribute items.
pub fn parse_folder(dir: &Path, mode: AbiReadMode) -> Result<Vec<AbiItem>, CatalogError> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
        })
        .collect();
    // Directory iteration order is platform-dependent; sort for determinism.
    entries.sort();

    let mut items = Vec::new();
    for path in entries {
        match parse_file(&path, mode) {
            Ok(parsed) => {
                debug!(file = %path.display(), count = parsed.len(), "parsed ABI file");
                items.extend(parsed);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "skipping ABI file"),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_ABI: &str = r#"[
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true,  "internalType": "address", "name": "from",  "type": "address"},
                {"indexed": true,  "internalType": "address", "name": "to",    "type": "address"},
                {"indexed": false, "internalType": "uint256", "name": "value", "type": "uint256"}
            ],
            "name": "Transfer",
            "type": "event"
        },
        {
            "name": "transfer",
            "type": "function",
            "inputs": [
                {"name": "to",     "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}],
            "stateMutability": "nonpayable"
        },
        {
            "type": "constructor",
            "inputs": [{"name": "owner", "type": "address"}]
        },
        {
            "type": "fallback",
            "stateMutability": "payable"
        }
    ]"#;

    fn addr() -> Address {
        "0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64".parse().unwrap()
    }

    #[test]
    fn parse_json_events_mode() {
        let items = parse_json(TRANSFER_ABI, addr(), AbiReadMode::Events).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.kind, ItemKind::Event);
        assert_eq!(item.name, "Transfer");
        assert_eq!(
            hex::encode(&item.hash),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(
            item.full_signature,
            "event Transfer(address indexed from, address indexed to, uint256 value)"
        );
        assert_eq!(item.num_indexed_args, Some(2));
        assert_eq!(item.num_data_args, Some(1));
        assert!(!item.anonymous);
        assert!(item.state_mutability.is_empty());
    }

    #[test]
    fn parse_json_functions_mode() {
        let items = parse_json(TRANSFER_ABI, addr(), AbiReadMode::Functions).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.kind, ItemKind::Function);
        assert_eq!(item.name, "transfer");
        assert_eq!(hex::encode(&item.hash), "a9059cbb");
        assert_eq!(
            item.full_signature,
            "function transfer(address to, uint256 amount) returns (bool)"
        );
        assert_eq!(item.num_inputs, Some(2));
        assert_eq!(item.num_outputs, Some(1));
        assert_eq!(item.state_mutability, "nonpayable");
    }

    #[test]
    fn parse_json_both_mode_skips_constructor_and_fallback() {
        let items = parse_json(TRANSFER_ABI, addr(), AbiReadMode::Both).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn parse_json_rejects_non_array() {
        assert!(matches!(
            parse_json("{}", addr(), AbiReadMode::Both),
            Err(CatalogError::InvalidAbiJson { .. })
        ));
    }

    #[test]
    fn parse_folder_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir
            .path()
            .join("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64.json");
        std::fs::write(&good, TRANSFER_ABI).unwrap();
        let bad_name = dir.path().join("not-an-address.json");
        std::fs::write(&bad_name, TRANSFER_ABI).unwrap();
        let bad_json = dir
            .path()
            .join("0x1234567890123456789012345678901234567890.json");
        std::fs::write(&bad_json, "not json").unwrap();
        let ignored = dir.path().join("readme.txt");
        std::fs::write(&ignored, "hi").unwrap();

        let items = parse_folder(dir.path(), AbiReadMode::Events).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Transfer");
    }
}
