//! Pipeline error types.
//!
//! These are file-scoped: one of them aborts the affected file, not the
//! whole folder run. Row-scoped failures use
//! [`chaindecode_core::error::DecodeError`] and land in the `error` column.

use chaindecode_abi::{CatalogError, FetchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input batch is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("cannot cast column '{column}': {reason}")]
    Cast { column: String, reason: String },

    #[error("failed to build chunk worker pool: {0}")]
    ThreadPool(String),

    #[error("decode task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("dataframe error: {0}")]
    Dataframe(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
