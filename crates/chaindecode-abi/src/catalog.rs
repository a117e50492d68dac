//! The catalog table: normalized ABI items persisted as a columnar file.
//!
//! The table is append-only from the caller's point of view: `update_catalog`
//! concatenates freshly parsed items onto the existing rows, drops rows whose
//! unique-key tuple is already present (earliest occurrence wins), and writes
//! the result back atomically. Insertion order is preserved — it is the
//! tie-break order for multi-match resolution downstream.

use crate::dataframes;
use crate::error::CatalogError;
use crate::item::{AbiItem, ItemKind};
use crate::reader;
use alloy_primitives::Address;
use chaindecode_core::config::{AbiReaderConfig, UniqueKeyField};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Column order of the catalog table.
pub const CATALOG_COLUMNS: [&str; 12] = [
    "kind",
    "address",
    "hash",
    "full_signature",
    "name",
    "anonymous",
    "state_mutability",
    "num_indexed_args",
    "num_data_args",
    "num_inputs",
    "num_outputs",
    "id",
];

/// Build the catalog dataframe from items, preserving order.
pub fn items_to_df(items: &[AbiItem]) -> Result<DataFrame, CatalogError> {
    let n = items.len();
    let mut kind = StringChunkedBuilder::new("kind".into(), n);
    let mut address = BinaryChunkedBuilder::new("address".into(), n);
    let mut hash = BinaryChunkedBuilder::new("hash".into(), n);
    let mut full_signature = StringChunkedBuilder::new("full_signature".into(), n);
    let mut name = StringChunkedBuilder::new("name".into(), n);
    let mut anonymous = Vec::with_capacity(n);
    let mut state_mutability = StringChunkedBuilder::new("state_mutability".into(), n);
    let mut num_indexed_args: Vec<Option<u32>> = Vec::with_capacity(n);
    let mut num_data_args: Vec<Option<u32>> = Vec::with_capacity(n);
    let mut num_inputs: Vec<Option<u32>> = Vec::with_capacity(n);
    let mut num_outputs: Vec<Option<u32>> = Vec::with_capacity(n);
    let mut id = StringChunkedBuilder::new("id".into(), n);

    for item in items {
        kind.append_value(&item.kind.to_string());
        address.append_value(item.address.as_slice());
        hash.append_value(&item.hash);
        full_signature.append_value(&item.full_signature);
        name.append_value(&item.name);
        anonymous.push(item.anonymous);
        state_mutability.append_value(&item.state_mutability);
        num_indexed_args.push(item.num_indexed_args);
        num_data_args.push(item.num_data_args);
        num_inputs.push(item.num_inputs);
        num_outputs.push(item.num_outputs);
        id.append_value(&item.id);
    }

    let df = DataFrame::new(vec![
        kind.finish().into_series().into_column(),
        address.finish().into_series().into_column(),
        hash.finish().into_series().into_column(),
        full_signature.finish().into_series().into_column(),
        name.finish().into_series().into_column(),
        Series::new("anonymous".into(), anonymous).into_column(),
        state_mutability.finish().into_series().into_column(),
        Series::new("num_indexed_args".into(), num_indexed_args).into_column(),
        Series::new("num_data_args".into(), num_data_args).into_column(),
        Series::new("num_inputs".into(), num_inputs).into_column(),
        Series::new("num_outputs".into(), num_outputs).into_column(),
        id.finish().into_series().into_column(),
    ])?;
    Ok(df)
}

fn required_binary<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a BinaryChunked, CatalogError> {
    df.column(name)
        .map_err(|_| CatalogError::MissingColumn {
            name: name.to_string(),
        })?
        .binary()
        .map_err(CatalogError::from)
}

fn required_str<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked, CatalogError> {
    df.column(name)
        .map_err(|_| CatalogError::MissingColumn {
            name: name.to_string(),
        })?
        .str()
        .map_err(CatalogError::from)
}

fn optional_u32(df: &DataFrame, name: &str, row: usize) -> Option<u32> {
    df.column(name)
        .ok()
        .and_then(|c| c.u32().ok())
        .and_then(|ca| ca.get(row))
}

/// Rebuild items from a catalog dataframe, preserving row order.
pub fn items_from_df(df: &DataFrame) -> Result<Vec<AbiItem>, CatalogError> {
    let kind = required_str(df, "kind")?;
    let address = required_binary(df, "address")?;
    let hash = required_binary(df, "hash")?;
    let full_signature = required_str(df, "full_signature")?;
    let name = required_str(df, "name")?;
    let anonymous = df
        .column("anonymous")
        .map_err(|_| CatalogError::MissingColumn {
            name: "anonymous".into(),
        })?
        .bool()?;
    let state_mutability = required_str(df, "state_mutability")?;
    let id = required_str(df, "id")?;

    let mut items = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let kind: ItemKind = kind
            .get(row)
            .unwrap_or_default()
            .parse()
            .map_err(|reason: String| CatalogError::InvalidAbiJson { reason })?;
        let addr_bytes = address.get(row).unwrap_or_default();
        if addr_bytes.len() != 20 {
            return Err(CatalogError::InvalidAddress {
                value: format!("0x{}", hex::encode(addr_bytes)),
            });
        }
        items.push(AbiItem {
            kind,
            address: Address::from_slice(addr_bytes),
            hash: hash.get(row).unwrap_or_default().to_vec(),
            full_signature: full_signature.get(row).unwrap_or_default().to_string(),
            name: name.get(row).unwrap_or_default().to_string(),
            anonymous: anonymous.get(row).unwrap_or(false),
            state_mutability: state_mutability.get(row).unwrap_or_default().to_string(),
            num_indexed_args: optional_u32(df, "num_indexed_args", row),
            num_data_args: optional_u32(df, "num_data_args", row),
            num_inputs: optional_u32(df, "num_inputs", row),
            num_outputs: optional_u32(df, "num_outputs", row),
            id: id.get(row).unwrap_or_default().to_string(),
        });
    }
    Ok(items)
}

/// Read a catalog file (parquet).
pub fn read_catalog(path: &Path) -> Result<Vec<AbiItem>, CatalogError> {
    let file = File::open(path)?;
    let df = ParquetReader::new(file).finish()?;
    items_from_df(&df)
}

/// Write the catalog atomically: parquet to a temp file, then rename.
pub fn write_catalog(items: &[AbiItem], path: &Path) -> Result<(), CatalogError> {
    let mut df = items_to_df(items)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("parquet.tmp");
    {
        let file = File::create(&tmp)?;
        ParquetWriter::new(file).finish(&mut df)?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Concatenate `fresh` onto `existing`, dropping rows whose unique-key tuple
/// was already seen. The earliest occurrence wins; order is preserved.
pub fn merge_items(
    existing: Vec<AbiItem>,
    fresh: Vec<AbiItem>,
    unique_key: &[UniqueKeyField],
) -> Vec<AbiItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + fresh.len());
    for item in existing.into_iter().chain(fresh) {
        if seen.insert(item.unique_key(unique_key)) {
            merged.push(item);
        }
    }
    merged
}

/// Merge freshly parsed ABIs from `folder` into the catalog at `db_path` and
/// return the updated table. Creates the catalog if it does not exist.
pub fn update_catalog(
    db_path: &Path,
    folder: &Path,
    config: &AbiReaderConfig,
) -> Result<DataFrame, CatalogError> {
    let existing = if db_path.exists() {
        read_catalog(db_path)?
    } else {
        Vec::new()
    };
    let fresh = reader::parse_folder(folder, config.abi_read_mode)?;
    let before = existing.len();
    let merged = merge_items(existing, fresh, &config.unique_key);
    info!(
        catalog = %db_path.display(),
        existing = before,
        total = merged.len(),
        "catalog updated"
    );
    write_catalog(&merged, db_path)?;
    let df = items_to_df(&merged)?;
    if config.output_hex_string_encoding {
        return Ok(dataframes::encode_binary_columns(&df)?);
    }
    Ok(df)
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

    fn reader_config() -> AbiReaderConfig {
        AbiReaderConfig::default()
    }

    fn sample_items(address: &str) -> Vec<AbiItem> {
        reader::parse_json(TRANSFER_ABI, address.parse().unwrap(), AbiReadMode::Events).unwrap()
    }

    #[test]
    fn items_df_round_trip() {
        let items = sample_items("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64");
        let df = items_to_df(&items).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.get_column_names().len(), CATALOG_COLUMNS.len());
        let back = items_from_df(&df).unwrap();
        assert_eq!(items, back);
    }

    #[test]
    fn merge_dedups_by_full_key() {
        let a = sample_items("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64");
        let b = sample_items("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64");
        let key = reader_config().unique_key;
        let merged = merge_items(a.clone(), b, &key);
        assert_eq!(merged.len(), a.len());
    }

    #[test]
    fn merge_keeps_distinct_addresses_under_full_key() {
        let a = sample_items("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64");
        let b = sample_items("0x1234567890123456789012345678901234567890");
        let key = reader_config().unique_key;
        let merged = merge_items(a, b, &key);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_collapses_by_hash_only() {
        let a = sample_items("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64");
        let b = sample_items("0x1234567890123456789012345678901234567890");
        let merged = merge_items(a.clone(), b, &[UniqueKeyField::Hash]);
        assert_eq!(merged.len(), 1);
        // earliest occurrence wins
        assert_eq!(merged[0].address, a[0].address);
    }

    #[test]
    fn update_catalog_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let abi_dir = dir.path().join("abis");
        std::fs::create_dir(&abi_dir).unwrap();
        std::fs::write(
            abi_dir.join("0xE672E0E0101A7F58d728751E2a5e6Da5Ff1FDa64.json"),
            TRANSFER_ABI,
        )
        .unwrap();
        let db = dir.path().join("abi_db.parquet");

        let first = update_catalog(&db, &abi_dir, &reader_config()).unwrap();
        assert!(db.exists());
        let second = update_catalog(&db, &abi_dir, &reader_config()).unwrap();
        assert_eq!(first.height(), second.height());
        assert!(first.equals_missing(&second));
    }
}
