//! Process-wide configuration.
//!
//! A single mutable `Config` is held behind a lock, initialized from
//! defaults at startup. `set_config` updates one dotted key, `set_config_toml`
//! overlays a partial TOML file on the defaults; both validate fully before
//! committing, so a rejected update never mutates state.
//!
//! Engine entry points take an explicit `&Config`; callers that want the
//! global state snapshot it once per invocation via [`snapshot`].

use crate::error::ConfigError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;

/// Dataframe flavor returned by host bindings. The engine itself is
/// indifferent; the value only shapes what bindings hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataframeType {
    Polars,
    Pandas,
}

/// Which ABI entry kinds the reader keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiReadMode {
    Events,
    Functions,
    Both,
}

/// Matching algorithm for resolving raw rows against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchAlgorithm {
    Hash,
    HashAddress,
}

/// Output table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFileFormat {
    Parquet,
    Csv,
}

impl OutputFileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFileFormat::Parquet => "parquet",
            OutputFileFormat::Csv => "csv",
        }
    }
}

/// Physical encoding of a raw byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnEncoding {
    Binary,
    HexString,
}

/// One component of the catalog unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueKeyField {
    Hash,
    FullSignature,
    Address,
}

// Enum values arrive from TOML files, dotted-key updates, and host bindings
// in whatever casing the caller used; normalize by lowercasing and dropping
// separators before matching.
fn normalize_enum(s: &str) -> String {
    s.to_lowercase().replace(['_', '-', ' '], "")
}

impl FromStr for DataframeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "polars" => Ok(DataframeType::Polars),
            "pandas" => Ok(DataframeType::Pandas),
            _ => Err(format!("'{s}' is not one of: Polars, Pandas")),
        }
    }
}

impl FromStr for AbiReadMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "events" => Ok(AbiReadMode::Events),
            "functions" => Ok(AbiReadMode::Functions),
            "both" => Ok(AbiReadMode::Both),
            _ => Err(format!("'{s}' is not one of: Events, Functions, Both")),
        }
    }
}

impl FromStr for MatchAlgorithm {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "hash" => Ok(MatchAlgorithm::Hash),
            "hashaddress" => Ok(MatchAlgorithm::HashAddress),
            _ => Err(format!("'{s}' is not one of: Hash, HashAddress")),
        }
    }
}

impl FromStr for OutputFileFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "parquet" => Ok(OutputFileFormat::Parquet),
            "csv" => Ok(OutputFileFormat::Csv),
            _ => Err(format!("'{s}' is not one of: parquet, csv")),
        }
    }
}

impl FromStr for ColumnEncoding {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "binary" => Ok(ColumnEncoding::Binary),
            "hexstring" => Ok(ColumnEncoding::HexString),
            _ => Err(format!("'{s}' is not one of: Binary, HexString")),
        }
    }
}

impl FromStr for UniqueKeyField {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_enum(s).as_str() {
            "hash" => Ok(UniqueKeyField::Hash),
            "fullsignature" => Ok(UniqueKeyField::FullSignature),
            "address" => Ok(UniqueKeyField::Address),
            _ => Err(format!("'{s}' is not one of: hash, full_signature, address")),
        }
    }
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub preferred_dataframe_type: DataframeType,
    pub unnesting_hex_string_encoding: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            preferred_dataframe_type: DataframeType::Polars,
            unnesting_hex_string_encoding: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainConfig {
    pub events_abi_db_file_path: String,
    pub functions_abi_db_file_path: String,
    pub abi_folder_path: String,
    pub raw_logs_folder_path: String,
    pub raw_traces_folder_path: String,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            events_abi_db_file_path: "ABIs/ethereum__events__abis.parquet".into(),
            functions_abi_db_file_path: "ABIs/ethereum__functions__abis.parquet".into(),
            abi_folder_path: "ABIs/abi_database".into(),
            raw_logs_folder_path: "data/logs".into(),
            raw_traces_folder_path: "data/traces".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiReaderConfig {
    pub abi_read_mode: AbiReadMode,
    pub output_hex_string_encoding: bool,
    pub unique_key: Vec<UniqueKeyField>,
}

impl Default for AbiReaderConfig {
    fn default() -> Self {
        Self {
            abi_read_mode: AbiReadMode::Events,
            output_hex_string_encoding: false,
            unique_key: vec![
                UniqueKeyField::Hash,
                UniqueKeyField::FullSignature,
                UniqueKeyField::Address,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub algorithm: MatchAlgorithm,
    pub output_hex_string_encoding: bool,
    pub output_file_format: OutputFileFormat,
    pub max_concurrent_files_decoding: usize,
    pub max_chunk_threads_per_file: usize,
    pub decoded_chunk_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            algorithm: MatchAlgorithm::Hash,
            output_hex_string_encoding: false,
            output_file_format: OutputFileFormat::Parquet,
            max_concurrent_files_decoding: 16,
            max_chunk_threads_per_file: 16,
            decoded_chunk_size: 500_000,
        }
    }
}

/// Canonical log column names, declaration order.
pub const LOG_COLUMNS: [&str; 6] = ["topic0", "topic1", "topic2", "topic3", "data", "address"];

/// Canonical trace column names, declaration order.
pub const TRACE_COLUMNS: [&str; 4] = ["selector", "action_input", "result_output", "action_to"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSchemaConfig {
    /// canonical name → user column name
    pub log_alias: IndexMap<String, String>,
    pub log_datatype: IndexMap<String, ColumnEncoding>,
}

impl Default for LogSchemaConfig {
    fn default() -> Self {
        Self {
            log_alias: LOG_COLUMNS
                .iter()
                .map(|c| (c.to_string(), c.to_string()))
                .collect(),
            log_datatype: LOG_COLUMNS
                .iter()
                .map(|c| (c.to_string(), ColumnEncoding::Binary))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogDecoderConfig {
    pub log_schema: LogSchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSchemaConfig {
    pub trace_alias: IndexMap<String, String>,
    pub trace_datatype: IndexMap<String, ColumnEncoding>,
}

impl Default for TraceSchemaConfig {
    fn default() -> Self {
        Self {
            trace_alias: TRACE_COLUMNS
                .iter()
                .map(|c| (c.to_string(), c.to_string()))
                .collect(),
            trace_datatype: TRACE_COLUMNS
                .iter()
                .map(|c| (c.to_string(), ColumnEncoding::Binary))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDecoderConfig {
    /// Strip the 4-byte selector prefix from `action_input` when it matches
    /// the row's selector. Some trace exporters ship inputs without the
    /// prefix; disabling the heuristic decodes `action_input` verbatim.
    pub strip_selector_prefix: bool,
    pub trace_schema: TraceSchemaConfig,
}

impl Default for TraceDecoderConfig {
    fn default() -> Self {
        Self {
            strip_selector_prefix: true,
            trace_schema: TraceSchemaConfig::default(),
        }
    }
}

/// The full process configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chaindecode: ToolConfig,
    pub main: MainConfig,
    pub abi_reader: AbiReaderConfig,
    pub decoder: DecoderConfig,
    pub log_decoder: LogDecoderConfig,
    pub trace_decoder: TraceDecoderConfig,
}

// ─── Dotted-key updates ──────────────────────────────────────────────────────

/// A dynamically-typed configuration value, as accepted by [`set_config`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}
impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}
impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}
impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}
impl From<Vec<String>> for ConfigValue {
    fn from(v: Vec<String>) -> Self {
        ConfigValue::List(v)
    }
}

impl ConfigValue {
    fn as_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::Int(0) => Ok(false),
            ConfigValue::Int(1) => Ok(true),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a boolean, got {other:?}"),
            }),
        }
    }

    fn as_count(&self, key: &str) -> Result<usize, ConfigError> {
        match self {
            ConfigValue::Int(i) if *i >= 1 => Ok(*i as usize),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected an integer >= 1, got {other:?}"),
            }),
        }
    }

    fn as_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self {
            ConfigValue::Str(s) => Ok(s),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string, got {other:?}"),
            }),
        }
    }

    fn as_str_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self {
            ConfigValue::Str(s) => Ok(vec![s.clone()]),
            ConfigValue::List(l) => Ok(l.clone()),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string or list of strings, got {other:?}"),
            }),
        }
    }

    fn as_enum<T: FromStr<Err = String>>(&self, key: &str) -> Result<T, ConfigError> {
        self.as_str(key)?
            .parse::<T>()
            .map_err(|reason| ConfigError::InvalidValue {
                key: key.to_string(),
                reason,
            })
    }
}

fn set_alias(
    map: &mut IndexMap<String, String>,
    canonical: &'static [&'static str],
    key: &str,
    column: &str,
    value: &ConfigValue,
) -> Result<(), ConfigError> {
    if !canonical.contains(&column) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
        });
    }
    map.insert(column.to_string(), value.as_str(key)?.to_string());
    Ok(())
}

fn set_datatype(
    map: &mut IndexMap<String, ColumnEncoding>,
    canonical: &'static [&'static str],
    key: &str,
    column: &str,
    value: &ConfigValue,
) -> Result<(), ConfigError> {
    if !canonical.contains(&column) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
        });
    }
    map.insert(column.to_string(), value.as_enum(key)?);
    Ok(())
}

impl Config {
    /// Apply one dotted-key update. Enum values are case-normalized.
    pub fn apply(&mut self, key: &str, value: &ConfigValue) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey {
            key: key.to_string(),
        };
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["chaindecode", "preferred_dataframe_type"] => {
                self.chaindecode.preferred_dataframe_type = value.as_enum(key)?;
            }
            ["chaindecode", "unnesting_hex_string_encoding"] => {
                self.chaindecode.unnesting_hex_string_encoding = value.as_bool(key)?;
            }
            ["main", "events_abi_db_file_path"] => {
                self.main.events_abi_db_file_path = value.as_str(key)?.to_string();
            }
            ["main", "functions_abi_db_file_path"] => {
                self.main.functions_abi_db_file_path = value.as_str(key)?.to_string();
            }
            ["main", "abi_folder_path"] => {
                self.main.abi_folder_path = value.as_str(key)?.to_string();
            }
            ["main", "raw_logs_folder_path"] => {
                self.main.raw_logs_folder_path = value.as_str(key)?.to_string();
            }
            ["main", "raw_traces_folder_path"] => {
                self.main.raw_traces_folder_path = value.as_str(key)?.to_string();
            }
            ["abi_reader", "abi_read_mode"] => {
                self.abi_reader.abi_read_mode = value.as_enum(key)?;
            }
            ["abi_reader", "output_hex_string_encoding"] => {
                self.abi_reader.output_hex_string_encoding = value.as_bool(key)?;
            }
            ["abi_reader", "unique_key"] => {
                let fields = value
                    .as_str_list(key)?
                    .iter()
                    .map(|s| {
                        s.parse::<UniqueKeyField>()
                            .map_err(|reason| ConfigError::InvalidValue {
                                key: key.to_string(),
                                reason,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if fields.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "unique_key must not be empty".into(),
                    });
                }
                self.abi_reader.unique_key = fields;
            }
            ["decoder", "algorithm"] => {
                self.decoder.algorithm = value.as_enum(key)?;
            }
            ["decoder", "output_hex_string_encoding"] => {
                self.decoder.output_hex_string_encoding = value.as_bool(key)?;
            }
            ["decoder", "output_file_format"] => {
                self.decoder.output_file_format = value.as_enum(key)?;
            }
            ["decoder", "max_concurrent_files_decoding"] => {
                self.decoder.max_concurrent_files_decoding = value.as_count(key)?;
            }
            ["decoder", "max_chunk_threads_per_file"] => {
                self.decoder.max_chunk_threads_per_file = value.as_count(key)?;
            }
            ["decoder", "decoded_chunk_size"] => {
                self.decoder.decoded_chunk_size = value.as_count(key)?;
            }
            ["log_decoder", "log_schema", "log_alias", column] => {
                set_alias(
                    &mut self.log_decoder.log_schema.log_alias,
                    &LOG_COLUMNS,
                    key,
                    *column,
                    value,
                )?;
            }
            ["log_decoder", "log_schema", "log_datatype", column] => {
                set_datatype(
                    &mut self.log_decoder.log_schema.log_datatype,
                    &LOG_COLUMNS,
                    key,
                    *column,
                    value,
                )?;
            }
            ["trace_decoder", "strip_selector_prefix"] => {
                self.trace_decoder.strip_selector_prefix = value.as_bool(key)?;
            }
            ["trace_decoder", "trace_schema", "trace_alias", column] => {
                set_alias(
                    &mut self.trace_decoder.trace_schema.trace_alias,
                    &TRACE_COLUMNS,
                    key,
                    *column,
                    value,
                )?;
            }
            ["trace_decoder", "trace_schema", "trace_datatype", column] => {
                set_datatype(
                    &mut self.trace_decoder.trace_schema.trace_datatype,
                    &TRACE_COLUMNS,
                    key,
                    *column,
                    value,
                )?;
            }
            _ => return Err(unknown()),
        }
        Ok(())
    }

    /// Overlay a parsed TOML document, key by key, so enum normalization and
    /// validation apply to file input exactly as to programmatic updates.
    fn apply_toml_table(
        &mut self,
        prefix: &str,
        table: &toml::value::Table,
    ) -> Result<(), ConfigError> {
        for (name, item) in table {
            let key = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match item {
                toml::Value::Table(inner) => self.apply_toml_table(&key, inner)?,
                toml::Value::Boolean(b) => self.apply(&key, &ConfigValue::Bool(*b))?,
                toml::Value::Integer(i) => self.apply(&key, &ConfigValue::Int(*i))?,
                toml::Value::String(s) => self.apply(&key, &ConfigValue::Str(s.clone()))?,
                toml::Value::Array(items) => {
                    let strings = items
                        .iter()
                        .map(|v| {
                            v.as_str().map(str::to_string).ok_or_else(|| {
                                ConfigError::InvalidValue {
                                    key: key.clone(),
                                    reason: "expected an array of strings".into(),
                                }
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    self.apply(&key, &ConfigValue::List(strings))?;
                }
                other => {
                    return Err(ConfigError::InvalidValue {
                        key,
                        reason: format!("unsupported TOML value: {other}"),
                    })
                }
            }
        }
        Ok(())
    }

    /// Build a config from defaults overlaid with a partial TOML document.
    pub fn from_toml_overlay(text: &str) -> Result<Self, ConfigError> {
        let doc: toml::Value = toml::from_str(text)?;
        let table = doc.as_table().ok_or_else(|| ConfigError::InvalidValue {
            key: String::new(),
            reason: "top-level TOML value must be a table".into(),
        })?;
        let mut config = Config::default();
        config.apply_toml_table("", table)?;
        Ok(config)
    }

    /// Render the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ─── Global state ────────────────────────────────────────────────────────────

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// A point-in-time copy of the process configuration.
pub fn snapshot() -> Config {
    CONFIG.read().expect("config lock poisoned").clone()
}

/// Replace the whole process configuration. Tests that call this must
/// restore the previous value.
pub fn replace(config: Config) {
    *CONFIG.write().expect("config lock poisoned") = config;
}

/// The process configuration rendered as TOML.
pub fn get_config() -> Result<String, ConfigError> {
    snapshot().to_toml()
}

/// Update a single dotted key, e.g.
/// `set_config("decoder.algorithm", "hash_address".into())`.
pub fn set_config(key: &str, value: ConfigValue) -> Result<(), ConfigError> {
    let mut updated = snapshot();
    updated.apply(key, &value)?;
    replace(updated);
    Ok(())
}

/// Overlay a TOML file on the default configuration and install the result.
pub fn set_config_toml(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let config = Config::from_toml_overlay(&text)?;
    replace(config);
    Ok(())
}
