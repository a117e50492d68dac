//! Error types for the ChainDecode decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a single raw row.
///
/// These are row-scoped: the batch pipeline captures them in the `error`
/// output column and keeps going.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("unsupported Solidity type: {ty}")]
    UnsupportedType { ty: String },

    #[error("length mismatch: {reason}")]
    LengthMismatch { reason: String },

    #[error("offset out of bounds: {reason}")]
    OffsetOutOfBounds { reason: String },

    #[error("integer overflow: {reason}")]
    IntegerOverflow { reason: String },

    /// Soft error: the function declares outputs but the trace carries none.
    #[error("empty output for a function that declares return values")]
    EmptyOutput,

    /// The row resolved to no catalog entry. Not a failure per se; surfaced
    /// so that every row carries an explicit outcome.
    #[error("no match")]
    NoMatch,
}

impl DecodeError {
    /// Classify an alloy ABI decoding failure into the codec taxonomy.
    pub fn from_alloy(e: alloy_dyn_abi::Error) -> Self {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("offset") || lower.contains("out of bounds") || lower.contains("overrun")
        {
            DecodeError::OffsetOutOfBounds { reason: msg }
        } else if lower.contains("overflow") {
            DecodeError::IntegerOverflow { reason: msg }
        } else if lower.contains("invalid type") || lower.contains("unsupported") {
            DecodeError::UnsupportedType { ty: msg }
        } else {
            DecodeError::MalformedPayload { reason: msg }
        }
    }
}

/// Errors from parsing or re-canonicalizing a signature string.
#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("invalid signature '{signature}': {reason}")]
    Parse { signature: String, reason: String },

    #[error("unknown Solidity type '{ty}' in signature")]
    UnknownType { ty: String },
}

/// Errors from the process-wide configuration.
///
/// `set_config` / `set_config_toml` return these without mutating state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration key '{key}'")]
    UnknownKey { key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
