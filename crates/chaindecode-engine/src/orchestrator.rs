//! File-level orchestration.
//!
//! Every raw file is an independent task: it acquires a slot from a
//! semaphore of capacity `max_concurrent_files_decoding`, runs the chunk
//! pipeline on a blocking thread, and writes its output to
//! `<parent(dir)>/decoded/` via temp-file-then-rename so a cancelled run
//! never leaves a partial output behind. Per-file failures are collected in
//! the summary; the remaining files keep going.

use crate::error::PipelineError;
use crate::pipeline;
use crate::DecoderKind;
use chaindecode_abi::{catalog, dataframes, fetch::AbiFetcher, reader, AbiItem};
use chaindecode_core::config::{Config, OutputFileFormat};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Outcome of a folder decode run.
#[derive(Debug, Default)]
pub struct FolderSummary {
    pub total_files: usize,
    pub decoded_files: usize,
    /// Per-file failures; the rest of the folder still decoded.
    pub failures: Vec<(PathBuf, String)>,
}

fn task_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Task(e.to_string())
}

/// Derive the output path for one raw file.
fn output_path(
    folder: &Path,
    file: &Path,
    kind: DecoderKind,
    format: OutputFileFormat,
) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch");
    let parent = folder.parent().unwrap_or_else(|| Path::new(""));
    parent
        .join("decoded")
        .join(kind.decoded_stem(stem))
        .with_extension(format.extension())
}

/// Write a decoded batch atomically: temp file in the target directory, then
/// rename over the final path.
fn write_output(
    mut df: DataFrame,
    path: &Path,
    format: OutputFileFormat,
) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension(format!("{}.tmp", format.extension()));
    {
        let file = File::create(&tmp)?;
        match format {
            OutputFileFormat::Parquet => {
                ParquetWriter::new(file).finish(&mut df)?;
            }
            OutputFileFormat::Csv => {
                // CSV cannot carry raw bytes; hex-encode whatever is still binary.
                let mut encoded = dataframes::encode_binary_columns(&df)?;
                CsvWriter::new(file).finish(&mut encoded)?;
            }
        }
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn decode_one_file(
    kind: DecoderKind,
    folder: &Path,
    file: &Path,
    items: &[AbiItem],
    config: &Config,
) -> Result<(), PipelineError> {
    let df = ParquetReader::new(File::open(file)?).finish()?;
    let rows = df.height();
    let decoded = pipeline::decode_df_with_items(kind, &df, items, config)?;
    let out = output_path(folder, file, kind, config.decoder.output_file_format);
    write_output(decoded, &out, config.decoder.output_file_format)?;
    info!(
        file = %file.display(),
        output = %out.display(),
        rows,
        "decoded file"
    );
    Ok(())
}

fn list_raw_files(folder: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("parquet")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Decode every raw file in `folder` against the catalog at `db_path`,
/// writing outputs next to the folder under `decoded/`.
pub async fn decode_folder(
    kind: DecoderKind,
    folder: &Path,
    db_path: &Path,
    config: &Config,
) -> Result<FolderSummary, PipelineError> {
    let items = {
        let db_path = db_path.to_path_buf();
        tokio::task::spawn_blocking(move || catalog::read_catalog(&db_path))
            .await
            .map_err(task_error)??
    };
    let files = list_raw_files(folder)?;
    info!(
        kind = kind.as_str(),
        folder = %folder.display(),
        files = files.len(),
        catalog_items = items.len(),
        "decoding folder"
    );

    let semaphore = Arc::new(Semaphore::new(config.decoder.max_concurrent_files_decoding));
    let items = Arc::new(items);
    let config = Arc::new(config.clone());

    let mut handles = Vec::with_capacity(files.len());
    for file in &files {
        let semaphore = Arc::clone(&semaphore);
        let items = Arc::clone(&items);
        let config = Arc::clone(&config);
        let folder = folder.to_path_buf();
        let file = file.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(task_error)?;
            tokio::task::spawn_blocking(move || {
                decode_one_file(kind, &folder, &file, &items, &config)
            })
            .await
            .map_err(task_error)?
        }));
    }

    let mut summary = FolderSummary {
        total_files: files.len(),
        ..FolderSummary::default()
    };
    for (file, handle) in files.iter().zip(handles) {
        match handle.await {
            Ok(Ok(())) => summary.decoded_files += 1,
            Ok(Err(e)) => {
                error!(file = %file.display(), error = %e, "file decode failed");
                summary.failures.push((file.clone(), e.to_string()));
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, "file task panicked");
                summary.failures.push((file.clone(), e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Decode a single raw file and return the decoded batch.
pub async fn decode_file(
    kind: DecoderKind,
    file: &Path,
    db_path: &Path,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let file = file.to_path_buf();
    let db_path = db_path.to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let items = catalog::read_catalog(&db_path)?;
        let df = ParquetReader::new(File::open(&file)?).finish()?;
        pipeline::decode_df_with_items(kind, &df, &items, &config)
    })
    .await
    .map_err(task_error)?
}

/// Shortcut path: fetch the contract's ABI from the public registry and
/// decode the batch against that one-contract catalog.
pub async fn decode_df_using_single_contract(
    kind: DecoderKind,
    df: &DataFrame,
    contract_address: &str,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    let address = contract_address
        .trim()
        .parse()
        .map_err(|_| {
            PipelineError::Catalog(chaindecode_abi::CatalogError::InvalidAddress {
                value: contract_address.to_string(),
            })
        })?;
    let abi_json = AbiFetcher::new().fetch_abi(1, contract_address).await?;
    let items = reader::parse_json(&abi_json, address, kind.abi_read_mode())?;
    let df = df.clone();
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        pipeline::decode_df_with_items(kind, &df, &items, &config)
    })
    .await
    .map_err(task_error)?
}

// ─── Blocking façades ────────────────────────────────────────────────────────
// The engine is pure CPU on a worker pool; these wrap the async entry points
// for callers without a runtime.

fn runtime() -> Result<tokio::runtime::Runtime, PipelineError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

pub fn decode_folder_blocking(
    kind: DecoderKind,
    folder: &Path,
    db_path: &Path,
    config: &Config,
) -> Result<FolderSummary, PipelineError> {
    runtime()?.block_on(decode_folder(kind, folder, db_path, config))
}

pub fn decode_file_blocking(
    kind: DecoderKind,
    file: &Path,
    db_path: &Path,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    runtime()?.block_on(decode_file(kind, file, db_path, config))
}

pub fn decode_df_using_single_contract_blocking(
    kind: DecoderKind,
    df: &DataFrame,
    contract_address: &str,
    config: &Config,
) -> Result<DataFrame, PipelineError> {
    runtime()?.block_on(decode_df_using_single_contract(
        kind,
        df,
        contract_address,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_for_logs() {
        let out = output_path(
            Path::new("data/logs"),
            Path::new("data/logs/ethereum__logs__18426253.parquet"),
            DecoderKind::Log,
            OutputFileFormat::Parquet,
        );
        assert_eq!(
            out,
            Path::new("data/decoded/ethereum__decoded_logs__18426253.parquet")
        );
    }

    #[test]
    fn output_path_for_traces_csv() {
        let out = output_path(
            Path::new("data/traces"),
            Path::new("data/traces/traces_7.parquet"),
            DecoderKind::Trace,
            OutputFileFormat::Csv,
        );
        assert_eq!(out, Path::new("data/decoded/decoded_traces_7.csv"));
    }
}
