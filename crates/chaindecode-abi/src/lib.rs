//! # chaindecode-abi
//!
//! The ABI catalog: parses Solidity ABI JSON into normalized items with
//! deterministic dispatch keys, merges them into a deduplicated columnar
//! table, and persists the table as the flat catalog the decode pipeline
//! joins against. Also hosts the single-contract remote ABI fetch used by
//! the shortcut decoding path.

pub mod catalog;
pub mod dataframes;
pub mod error;
pub mod fetch;
pub mod item;
pub mod reader;

pub use catalog::{items_from_df, items_to_df, read_catalog, update_catalog, write_catalog};
pub use error::CatalogError;
pub use fetch::{AbiFetcher, FetchError};
pub use item::{AbiItem, ItemKind};
pub use reader::{parse_file, parse_folder, parse_json};
