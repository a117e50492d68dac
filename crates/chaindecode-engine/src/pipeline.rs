//! Chunked, bounded-parallel batch decoding.
//!
//! The normalized batch is split into contiguous row slices of
//! `decoded_chunk_size`; each slice is matched against the broadcast catalog
//! index and decoded row by row on a rayon pool bounded by
//! `max_chunk_threads_per_file`. Chunk outputs are re-concatenated in
//! original order, so identical inputs and configuration produce identical
//! batches regardless of chunking.

use crate::error::PipelineError;
use crate::log_decoder::{self, RawLogRow};
use crate::matcher::{CatalogIndex, ResolvedItem};
use crate::params::ParamColumns;
use crate::trace_decoder::{self, RawTraceRow};
use crate::{DecoderKind, schema};
use chaindecode_abi::{AbiItem, catalog};
use chaindecode_core::config::Config;
use chaindecode_core::error::DecodeError;
use polars::prelude::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

/// Decode a raw batch against catalog items.
pub fn decode_df_with_items(
    kind: DecoderKind,
    df: &DataFrame,
    items: &[AbiItem],
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let normalized = schema::normalize_input(df, kind, config)?;
    let index = CatalogIndex::build(items, kind);
    info!(
        kind = kind.as_str(),
        rows = normalized.height(),
        catalog_items = index.len(),
        chunk_size = config.decoder.decoded_chunk_size,
        "decoding batch"
    );

    let chunk_size = config.decoder.decoded_chunk_size;
    let height = normalized.height();
    let chunks: Vec<DataFrame> = if height == 0 {
        vec![normalized.clone()]
    } else {
        (0..height)
            .step_by(chunk_size)
            .map(|offset| normalized.slice(offset as i64, chunk_size))
            .collect()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.decoder.max_chunk_threads_per_file)
        .build()
        .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
    let decoded: Result<Vec<DataFrame>, PipelineError> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| decode_chunk(chunk, kind, &index, config))
            .collect()
    });

    let mut parts = decoded?.into_iter();
    let mut out = parts
        .next()
        .unwrap_or_else(|| normalized.slice(0, 0));
    for part in parts {
        out.vstack_mut(&part)?;
    }
    out.as_single_chunk_par();
    schema::encode_output(out, config)
}

/// Decode a raw batch against a catalog table already in memory.
pub fn decode_df_with_abi_df(
    kind: DecoderKind,
    df: &DataFrame,
    abi_df: &DataFrame,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let items = catalog::items_from_df(abi_df)?;
    decode_df_with_items(kind, df, &items, config)
}

/// Decode a raw batch against the catalog file at `db_path`.
pub fn decode_df(
    kind: DecoderKind,
    df: &DataFrame,
    db_path: &Path,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let items = catalog::read_catalog(db_path)?;
    decode_df_with_items(kind, df, &items, config)
}

// ─── Per-chunk decoding ──────────────────────────────────────────────────────

/// Per-row outcome: metadata of the matched item (if any), decoded column
/// sets, and the error column value.
struct RowOutcome<'a> {
    item: Option<&'a AbiItem>,
    columns: Vec<ParamColumns>,
    error: Option<String>,
}

impl<'a> RowOutcome<'a> {
    fn unmatched(column_sets: usize) -> Self {
        RowOutcome {
            item: None,
            columns: vec![ParamColumns::empty(); column_sets],
            error: Some(DecodeError::NoMatch.to_string()),
        }
    }
}

struct OutcomeBuilders {
    name: StringChunkedBuilder,
    full_signature: StringChunkedBuilder,
    anonymous: BooleanChunkedBuilder,
    state_mutability: StringChunkedBuilder,
    id: StringChunkedBuilder,
    /// keys/values/json triples, one per column set (1 for logs, 2 for traces)
    sets: Vec<[StringChunkedBuilder; 3]>,
    error: StringChunkedBuilder,
}

impl OutcomeBuilders {
    fn new(kind: DecoderKind, capacity: usize) -> Self {
        let set_names: &[[&str; 3]] = match kind {
            DecoderKind::Log => &[["event_keys", "event_values", "event_json"]],
            DecoderKind::Trace => &[
                ["input_keys", "input_values", "input_json"],
                ["output_keys", "output_values", "output_json"],
            ],
        };
        OutcomeBuilders {
            name: StringChunkedBuilder::new("name".into(), capacity),
            full_signature: StringChunkedBuilder::new("full_signature".into(), capacity),
            anonymous: BooleanChunkedBuilder::new("anonymous".into(), capacity),
            state_mutability: StringChunkedBuilder::new("state_mutability".into(), capacity),
            id: StringChunkedBuilder::new("id".into(), capacity),
            sets: set_names
                .iter()
                .map(|names| {
                    [
                        StringChunkedBuilder::new(names[0].into(), capacity),
                        StringChunkedBuilder::new(names[1].into(), capacity),
                        StringChunkedBuilder::new(names[2].into(), capacity),
                    ]
                })
                .collect(),
            error: StringChunkedBuilder::new("error".into(), capacity),
        }
    }

    fn push(&mut self, outcome: RowOutcome<'_>) {
        match outcome.item {
            Some(item) => {
                self.name.append_value(&item.name);
                self.full_signature.append_value(&item.full_signature);
                self.anonymous.append_option(Some(item.anonymous));
                self.state_mutability.append_value(&item.state_mutability);
                self.id.append_value(&item.id);
                for (set, columns) in self.sets.iter_mut().zip(&outcome.columns) {
                    set[0].append_value(&columns.keys);
                    set[1].append_value(&columns.values);
                    set[2].append_value(&columns.json);
                }
            }
            None => {
                self.name.append_null();
                self.full_signature.append_null();
                self.anonymous.append_option(None);
                self.state_mutability.append_null();
                self.id.append_null();
                for set in self.sets.iter_mut() {
                    set[0].append_null();
                    set[1].append_null();
                    set[2].append_null();
                }
            }
        }
        match outcome.error {
            Some(e) => self.error.append_value(&e),
            None => self.error.append_null(),
        }
    }

    fn finish(self, df: &mut DataFrame) -> Result<(), PipelineError> {
        df.with_column(self.name.finish().into_series())?;
        df.with_column(self.full_signature.finish().into_series())?;
        df.with_column(self.anonymous.finish().into_series())?;
        df.with_column(self.state_mutability.finish().into_series())?;
        df.with_column(self.id.finish().into_series())?;
        for set in self.sets {
            for builder in set {
                df.with_column(builder.finish().into_series())?;
            }
        }
        df.with_column(self.error.finish().into_series())?;
        Ok(())
    }
}

fn binary_column<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a BinaryChunked, PipelineError> {
    df.column(name)
        .map_err(|_| PipelineError::MissingColumn {
            column: name.to_string(),
        })?
        .binary()
        .map_err(PipelineError::from)
}

fn decode_chunk(
    chunk: &DataFrame,
    kind: DecoderKind,
    index: &CatalogIndex,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let mut out = chunk.clone();
    let mut builders = OutcomeBuilders::new(kind, chunk.height());
    match kind {
        DecoderKind::Log => decode_log_rows(chunk, index, config, &mut builders)?,
        DecoderKind::Trace => decode_trace_rows(chunk, index, config, &mut builders)?,
    }
    builders.finish(&mut out)?;
    Ok(out)
}

fn decode_log_rows(
    chunk: &DataFrame,
    index: &CatalogIndex,
    config: &Config,
    builders: &mut OutcomeBuilders,
) -> Result<(), PipelineError> {
    let topic0 = binary_column(chunk, "topic0")?;
    let topic1 = binary_column(chunk, "topic1")?;
    let topic2 = binary_column(chunk, "topic2")?;
    let topic3 = binary_column(chunk, "topic3")?;
    let data = binary_column(chunk, "data")?;
    let address = binary_column(chunk, "address")?;

    for row in 0..chunk.height() {
        let Some(hash) = topic0.get(row) else {
            builders.push(RowOutcome::unmatched(1));
            continue;
        };
        let candidates =
            index.candidates(config.decoder.algorithm, hash, address.get(row));
        if candidates.is_empty() {
            builders.push(RowOutcome::unmatched(1));
            continue;
        }

        let raw = RawLogRow {
            topics: [
                Some(hash),
                topic1.get(row),
                topic2.get(row),
                topic3.get(row),
            ],
            data: data.get(row),
        };

        let mut first_failure: Option<(&ResolvedItem, DecodeError)> = None;
        let mut success: Option<(&ResolvedItem, ParamColumns)> = None;
        for candidate in candidates {
            let ResolvedItem::Event { item, params } = candidate else {
                continue;
            };
            match log_decoder::decode_log(&raw, item, params) {
                Ok(columns) => {
                    success = Some((candidate, columns));
                    break;
                }
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some((candidate, e));
                    }
                }
            }
        }

        match (success, first_failure) {
            (Some((resolved, columns)), _) => builders.push(RowOutcome {
                item: Some(resolved.item()),
                columns: vec![columns],
                error: None,
            }),
            (None, Some((resolved, e))) => builders.push(RowOutcome {
                item: Some(resolved.item()),
                columns: vec![ParamColumns::empty()],
                error: Some(e.to_string()),
            }),
            (None, None) => builders.push(RowOutcome::unmatched(1)),
        }
    }
    Ok(())
}

fn decode_trace_rows(
    chunk: &DataFrame,
    index: &CatalogIndex,
    config: &Config,
    builders: &mut OutcomeBuilders,
) -> Result<(), PipelineError> {
    let selector = binary_column(chunk, "selector")?;
    let action_input = binary_column(chunk, "action_input")?;
    let result_output = binary_column(chunk, "result_output")?;
    let action_to = binary_column(chunk, "action_to")?;
    let strip = config.trace_decoder.strip_selector_prefix;

    for row in 0..chunk.height() {
        let Some(hash) = selector.get(row) else {
            builders.push(RowOutcome::unmatched(2));
            continue;
        };
        let candidates =
            index.candidates(config.decoder.algorithm, hash, action_to.get(row));
        if candidates.is_empty() {
            builders.push(RowOutcome::unmatched(2));
            continue;
        }

        let raw = RawTraceRow {
            selector: Some(hash),
            action_input: action_input.get(row),
            result_output: result_output.get(row),
        };

        let mut first_failure: Option<(&ResolvedItem, DecodeError)> = None;
        let mut success = None;
        for candidate in candidates {
            let ResolvedItem::Function {
                item: _,
                inputs,
                outputs,
            } = candidate
            else {
                continue;
            };
            match trace_decoder::decode_trace(&raw, inputs, outputs, strip) {
                Ok(decoded) => {
                    success = Some((candidate, decoded));
                    break;
                }
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some((candidate, e));
                    }
                }
            }
        }

        match (success, first_failure) {
            (Some((resolved, decoded)), _) => builders.push(RowOutcome {
                item: Some(resolved.item()),
                columns: vec![decoded.input, decoded.output],
                error: decoded.soft_error.map(|e| e.to_string()),
            }),
            (None, Some((resolved, e))) => builders.push(RowOutcome {
                item: Some(resolved.item()),
                columns: vec![ParamColumns::empty(), ParamColumns::empty()],
                error: Some(e.to_string()),
            }),
            (None, None) => builders.push(RowOutcome::unmatched(2)),
        }
    }
    Ok(())
}
