//! Catalog error types.

use chaindecode_core::error::SignatureError;
use thiserror::Error;

/// Errors from parsing ABI JSON or maintaining the catalog table.
///
/// Folder-level operations treat per-file occurrences as non-fatal: the file
/// is skipped with a warning and parsing continues.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid ABI JSON: {reason}")]
    InvalidAbiJson { reason: String },

    #[error("invalid contract address '{value}'")]
    InvalidAddress { value: String },

    #[error("catalog table is missing column '{name}'")]
    MissingColumn { name: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataframe error: {0}")]
    Dataframe(#[from] polars::prelude::PolarsError),
}
