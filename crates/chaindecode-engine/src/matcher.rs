//! Raw-row to catalog-item resolution.
//!
//! The catalog is small relative to the batches, so it is "broadcast" as an
//! in-memory index keyed by dispatch hash. Several catalog rows can share a
//! hash (same signature registered under many addresses, or a reduced unique
//! key); candidates are returned in catalog insertion order and the row
//! decoder keeps the first successful decode, so output rows are never
//! duplicated and tie-breaks are deterministic.

use crate::DecoderKind;
use chaindecode_abi::{AbiItem, ItemKind};
use chaindecode_core::config::MatchAlgorithm;
use chaindecode_core::signature::{self, ResolvedParam};
use std::collections::HashMap;
use tracing::warn;

/// A catalog item with its signature resolved to decodable types.
#[derive(Debug, Clone)]
pub enum ResolvedItem {
    Event {
        item: AbiItem,
        params: Vec<ResolvedParam>,
    },
    Function {
        item: AbiItem,
        inputs: Vec<ResolvedParam>,
        outputs: Vec<ResolvedParam>,
    },
}

impl ResolvedItem {
    pub fn item(&self) -> &AbiItem {
        match self {
            ResolvedItem::Event { item, .. } | ResolvedItem::Function { item, .. } => item,
        }
    }

    fn resolve(item: AbiItem) -> Result<Self, chaindecode_core::error::SignatureError> {
        match item.kind {
            ItemKind::Event => {
                let event = signature::parse_event_signature(&item.full_signature)?;
                let params = signature::resolve_event_params(&event)?;
                Ok(ResolvedItem::Event { item, params })
            }
            ItemKind::Function => {
                let function = signature::parse_function_signature(&item.full_signature)?;
                let inputs = signature::resolve_function_params(&function.inputs)?;
                let outputs = signature::resolve_function_params(&function.outputs)?;
                Ok(ResolvedItem::Function {
                    item,
                    inputs,
                    outputs,
                })
            }
        }
    }
}

/// The broadcast catalog index for one pipeline invocation.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    items: Vec<ResolvedItem>,
    by_hash: HashMap<Vec<u8>, Vec<usize>>,
}

impl CatalogIndex {
    /// Build the index from catalog items, keeping only the kind this
    /// invocation decodes. Items whose stored signature no longer resolves
    /// are skipped with a warning.
    pub fn build(items: &[AbiItem], kind: DecoderKind) -> Self {
        let wanted = match kind {
            DecoderKind::Log => ItemKind::Event,
            DecoderKind::Trace => ItemKind::Function,
        };
        let mut index = CatalogIndex::default();
        for item in items.iter().filter(|i| i.kind == wanted) {
            match ResolvedItem::resolve(item.clone()) {
                Ok(resolved) => {
                    let idx = index.items.len();
                    index
                        .by_hash
                        .entry(item.hash.clone())
                        .or_default()
                        .push(idx);
                    index.items.push(resolved);
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "skipping unresolvable catalog item")
                }
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidate items for a raw row, most-preferred first.
    ///
    /// `Hash` returns every item sharing the dispatch hash in insertion
    /// order. `HashAddress` moves items registered under the row's address
    /// ahead of the rest (the hash-only fallback), preserving insertion
    /// order within each group.
    pub fn candidates(
        &self,
        algorithm: MatchAlgorithm,
        hash: &[u8],
        address: Option<&[u8]>,
    ) -> Vec<&ResolvedItem> {
        let Some(indices) = self.by_hash.get(hash) else {
            return Vec::new();
        };
        let all: Vec<&ResolvedItem> = indices.iter().map(|&i| &self.items[i]).collect();
        match (algorithm, address) {
            (MatchAlgorithm::Hash, _) | (MatchAlgorithm::HashAddress, None) => all,
            (MatchAlgorithm::HashAddress, Some(addr)) => {
                let (exact, fallback): (Vec<&ResolvedItem>, Vec<&ResolvedItem>) = all
                    .into_iter()
                    .partition(|r| r.item().address.as_slice() == addr);
                exact.into_iter().chain(fallback).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaindecode_core::config::AbiReadMode;

    const TRANSFER_ABI: &str = r#"[
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true,  "name": "from",  "type": "address"},
                {"indexed": true,  "name": "to",    "type": "address"},
                {"indexed": false, "name": "value", "type": "uint256"}
            ],
            "name": "Transfer",
            "type": "event"
        }
    ]"#;

    fn items_for(address: &str) -> Vec<AbiItem> {
        chaindecode_abi::parse_json(TRANSFER_ABI, address.parse().unwrap(), AbiReadMode::Events)
            .unwrap()
    }

    fn transfer_hash() -> Vec<u8> {
        hex::decode("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef").unwrap()
    }

    #[test]
    fn hash_candidates_in_insertion_order() {
        let a = items_for("0x1111111111111111111111111111111111111111");
        let b = items_for("0x2222222222222222222222222222222222222222");
        let items: Vec<AbiItem> = a.into_iter().chain(b).collect();
        let index = CatalogIndex::build(&items, DecoderKind::Log);
        assert_eq!(index.len(), 2);

        let candidates = index.candidates(MatchAlgorithm::Hash, &transfer_hash(), None);
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            hex::encode(candidates[0].item().address.as_slice()),
            "1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn hash_address_prefers_exact_then_falls_back() {
        let a = items_for("0x1111111111111111111111111111111111111111");
        let b = items_for("0x2222222222222222222222222222222222222222");
        let items: Vec<AbiItem> = a.into_iter().chain(b).collect();
        let index = CatalogIndex::build(&items, DecoderKind::Log);

        let addr = hex::decode("2222222222222222222222222222222222222222").unwrap();
        let candidates =
            index.candidates(MatchAlgorithm::HashAddress, &transfer_hash(), Some(&addr));
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            hex::encode(candidates[0].item().address.as_slice()),
            "2222222222222222222222222222222222222222"
        );

        // address with no exact entry falls back to hash order
        let other = hex::decode("3333333333333333333333333333333333333333").unwrap();
        let fallback =
            index.candidates(MatchAlgorithm::HashAddress, &transfer_hash(), Some(&other));
        assert_eq!(fallback.len(), 2);
        assert_eq!(
            hex::encode(fallback[0].item().address.as_slice()),
            "1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn unknown_hash_yields_no_candidates() {
        let items = items_for("0x1111111111111111111111111111111111111111");
        let index = CatalogIndex::build(&items, DecoderKind::Log);
        assert!(index
            .candidates(MatchAlgorithm::Hash, &[0u8; 32], None)
            .is_empty());
    }

    #[test]
    fn trace_index_ignores_events() {
        let items = items_for("0x1111111111111111111111111111111111111111");
        let index = CatalogIndex::build(&items, DecoderKind::Trace);
        assert!(index.is_empty());
    }
}
