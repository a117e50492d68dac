//! # chaindecode-core
//!
//! Core building blocks shared across all ChainDecode crates: the Solidity
//! type codec (canonical signatures, keccak dispatch hashes, decoded value
//! model), the decode error taxonomy, and the process-wide configuration.

pub mod config;
pub mod error;
pub mod hash;
pub mod signature;
pub mod value;

pub use config::{
    AbiReadMode, ColumnEncoding, Config, ConfigValue, DataframeType, MatchAlgorithm,
    OutputFileFormat, UniqueKeyField,
};
pub use error::{ConfigError, DecodeError, SignatureError};
pub use signature::{ResolvedParam, is_value_type};
pub use value::ParamValue;
