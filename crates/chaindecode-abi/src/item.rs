//! The normalized ABI item record — one catalog row.

use alloy_primitives::Address;
use chaindecode_core::config::UniqueKeyField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminates the two decodable ABI entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Event,
    Function,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Event => write!(f, "event"),
            ItemKind::Function => write!(f, "function"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(ItemKind::Event),
            "function" => Ok(ItemKind::Function),
            other => Err(format!("'{other}' is not an ABI item kind")),
        }
    }
}

/// A normalized ABI entry as stored in the catalog.
///
/// `hash` is the 32-byte topic0 for events and the 4-byte selector for
/// functions — in both cases a prefix of keccak256 of the canonical
/// signature. `id` is the catalog primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiItem {
    pub kind: ItemKind,
    /// Contract address the ABI was registered under.
    pub address: Address,
    pub hash: Vec<u8>,
    pub full_signature: String,
    pub name: String,
    /// Events only; always false for functions.
    pub anonymous: bool,
    /// Functions only; empty for events.
    pub state_mutability: String,
    pub num_indexed_args: Option<u32>,
    pub num_data_args: Option<u32>,
    pub num_inputs: Option<u32>,
    pub num_outputs: Option<u32>,
    pub id: String,
}

impl AbiItem {
    /// `"<hash hex> - <full_signature> - <address hex>"`.
    pub fn make_id(hash: &[u8], full_signature: &str, address: &Address) -> String {
        format!(
            "0x{} - {} - 0x{}",
            hex::encode(hash),
            full_signature,
            hex::encode(address.as_slice())
        )
    }

    /// The dedup key under the configured unique-key subset.
    pub fn unique_key(&self, fields: &[UniqueKeyField]) -> String {
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            match field {
                UniqueKeyField::Hash => parts.push(hex::encode(&self.hash)),
                UniqueKeyField::FullSignature => parts.push(self.full_signature.clone()),
                UniqueKeyField::Address => parts.push(hex::encode(self.address.as_slice())),
            }
        }
        parts.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> AbiItem {
        let address: Address = "0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64"
            .parse()
            .unwrap();
        let hash =
            hex::decode("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
                .unwrap();
        let full_signature =
            "event Transfer(address indexed from, address indexed to, uint256 value)".to_string();
        let id = AbiItem::make_id(&hash, &full_signature, &address);
        AbiItem {
            kind: ItemKind::Event,
            address,
            hash,
            full_signature,
            name: "Transfer".into(),
            anonymous: false,
            state_mutability: String::new(),
            num_indexed_args: Some(2),
            num_data_args: Some(1),
            num_inputs: None,
            num_outputs: None,
            id,
        }
    }

    #[test]
    fn id_format() {
        let item = sample_item();
        assert_eq!(
            item.id,
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef - \
             event Transfer(address indexed from, address indexed to, uint256 value) - \
             0xe672e0e0101a7f58d728751e2a5e6da5ff1fda64"
        );
    }

    #[test]
    fn unique_key_respects_subset() {
        let item = sample_item();
        let by_hash = item.unique_key(&[UniqueKeyField::Hash]);
        let full = item.unique_key(&[
            UniqueKeyField::Hash,
            UniqueKeyField::FullSignature,
            UniqueKeyField::Address,
        ]);
        assert!(full.starts_with(&by_hash));
        assert!(full.contains("Transfer(address"));
        assert!(full.ends_with("e672e0e0101a7f58d728751e2a5e6da5ff1fda64"));
    }
}
