//! # chaindecode-engine
//!
//! The decode pipeline: resolves each raw log/trace row against the ABI
//! catalog, decodes its binary payload, and reassembles the results into the
//! output batch. Chunks decode in parallel on a bounded rayon pool; files
//! decode in parallel under a semaphore-bounded tokio task layer.

pub mod error;
pub mod log_decoder;
pub mod matcher;
pub mod orchestrator;
pub mod params;
pub mod pipeline;
pub mod schema;
pub mod trace_decoder;

pub use error::PipelineError;
pub use matcher::{CatalogIndex, ResolvedItem};
pub use orchestrator::{
    FolderSummary, decode_df_using_single_contract, decode_df_using_single_contract_blocking,
    decode_file, decode_file_blocking, decode_folder, decode_folder_blocking,
};
pub use pipeline::{decode_df, decode_df_with_abi_df, decode_df_with_items};

use chaindecode_core::config::AbiReadMode;

/// Which artifact kind a pipeline invocation decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Log,
    Trace,
}

impl DecoderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecoderKind::Log => "log",
            DecoderKind::Trace => "trace",
        }
    }

    /// The catalog side this kind decodes against.
    pub fn abi_read_mode(self) -> AbiReadMode {
        match self {
            DecoderKind::Log => AbiReadMode::Events,
            DecoderKind::Trace => AbiReadMode::Functions,
        }
    }

    /// Output file stem for a raw input stem:
    /// `logs` → `decoded_logs`, `traces` → `decoded_traces`; a stem naming
    /// neither gets a `decoded_` prefix.
    pub fn decoded_stem(self, stem: &str) -> String {
        let (needle, replacement) = match self {
            DecoderKind::Log => ("logs", "decoded_logs"),
            DecoderKind::Trace => ("traces", "decoded_traces"),
        };
        if stem.contains(needle) {
            stem.replace(needle, replacement)
        } else {
            format!("decoded_{stem}")
        }
    }
}

impl std::str::FromStr for DecoderKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" | "logs" => Ok(DecoderKind::Log),
            "trace" | "traces" => Ok(DecoderKind::Trace),
            other => Err(format!("'{other}' is not a decoder kind (log | trace)")),
        }
    }
}
