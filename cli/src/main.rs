//! ChainDecode CLI — batch-decode EVM logs and traces from the command line.
//!
//! # Commands
//! ```
//! chaindecode abi update    [--db <path>] [--folder <dir>]
//! chaindecode abi read      [--folder <dir>]
//! chaindecode decode logs   [--folder <dir>] [--db <path>]
//! chaindecode decode traces [--folder <dir>] [--db <path>]
//! chaindecode decode file   --kind <log|trace> --file <path> [--db <path>]
//! chaindecode config show
//! chaindecode config set    <key> <value>
//! chaindecode config load   <path.toml>
//! chaindecode info
//! ```

use anyhow::{Context, Result, bail};
use chaindecode_core::config::{self, Config, ConfigValue};
use chaindecode_engine::DecoderKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chaindecode",
    about = "Batch decoder for EVM logs and traces — ChainDecode CLI",
    long_about = "
ChainDecode CLI: parse contract ABIs into a flat catalog, then batch-decode
columnar tables of raw logs and traces against it. Built on alloy-rs.

ENVIRONMENT VARIABLES:
  RUST_LOG    tracing filter, e.g. 'info,chaindecode_engine=debug'
",
    version
)]
struct Cli {
    /// Overlay a TOML config file on the defaults before running
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ABI catalog maintenance
    Abi {
        #[command(subcommand)]
        action: AbiAction,
    },

    /// Decode raw batches against the catalog
    Decode {
        #[command(subcommand)]
        action: DecodeAction,
    },

    /// Inspect or modify the process configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show ChainDecode build and capability info
    Info,
}

#[derive(Subcommand)]
enum AbiAction {
    /// Merge a folder of ABI JSON files into the catalog
    Update {
        /// Catalog file (default: the configured events DB path)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Folder of `0x<address>.json` files (default: configured path)
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Parse a folder of ABI JSON files and print the items
    Read {
        #[arg(long)]
        folder: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DecodeAction {
    /// Decode every raw log file in a folder
    Logs {
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Decode every raw trace file in a folder
    Traces {
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Decode a single file and print a preview
    File {
        /// log | trace
        #[arg(long)]
        kind: DecoderKindArg,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Clone, Copy)]
struct DecoderKindArg(DecoderKind);

impl std::str::FromStr for DecoderKindArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<DecoderKind>().map(DecoderKindArg)
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration as TOML
    Show,
    /// Set one dotted key, e.g. `decoder.algorithm hash_address`
    Set { key: String, value: String },
    /// Overlay a TOML file on the defaults
    Load { path: PathBuf },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(path) = &cli.config {
        config::set_config_toml(path)
            .with_context(|| format!("load config '{}'", path.display()))?;
    }

    match cli.command {
        Commands::Abi { action } => match action {
            AbiAction::Update { db, folder } => cmd_abi_update(db, folder),
            AbiAction::Read { folder } => cmd_abi_read(folder),
        },

        Commands::Decode { action } => match action {
            DecodeAction::Logs { folder, db } => {
                cmd_decode_folder(DecoderKind::Log, folder, db).await
            }
            DecodeAction::Traces { folder, db } => {
                cmd_decode_folder(DecoderKind::Trace, folder, db).await
            }
            DecodeAction::File { kind, file, db } => cmd_decode_file(kind.0, file, db).await,
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value),
            ConfigAction::Load { path } => {
                config::set_config_toml(&path)
                    .with_context(|| format!("load config '{}'", path.display()))?;
                cmd_config_show()
            }
        },

        Commands::Info => cmd_info(),
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

fn default_db(kind: DecoderKind, config: &Config) -> PathBuf {
    match kind {
        DecoderKind::Log => PathBuf::from(&config.main.events_abi_db_file_path),
        DecoderKind::Trace => PathBuf::from(&config.main.functions_abi_db_file_path),
    }
}

fn default_folder(kind: DecoderKind, config: &Config) -> PathBuf {
    match kind {
        DecoderKind::Log => PathBuf::from(&config.main.raw_logs_folder_path),
        DecoderKind::Trace => PathBuf::from(&config.main.raw_traces_folder_path),
    }
}

fn cmd_abi_update(db: Option<PathBuf>, folder: Option<PathBuf>) -> Result<()> {
    let config = config::snapshot();
    let db = db.unwrap_or_else(|| PathBuf::from(&config.main.events_abi_db_file_path));
    let folder = folder.unwrap_or_else(|| PathBuf::from(&config.main.abi_folder_path));

    let df = chaindecode_abi::update_catalog(&db, &folder, &config.abi_reader)
        .with_context(|| format!("update catalog '{}'", db.display()))?;
    println!("Catalog '{}' now holds {} items", db.display(), df.height());
    println!("{df}");
    Ok(())
}

fn cmd_abi_read(folder: Option<PathBuf>) -> Result<()> {
    let config = config::snapshot();
    let folder = folder.unwrap_or_else(|| PathBuf::from(&config.main.abi_folder_path));
    let items = chaindecode_abi::parse_folder(&folder, config.abi_reader.abi_read_mode)
        .with_context(|| format!("read ABI folder '{}'", folder.display()))?;
    println!("Parsed {} items from '{}'", items.len(), folder.display());
    for item in &items {
        println!("  {}", item.id);
    }
    Ok(())
}

async fn cmd_decode_folder(
    kind: DecoderKind,
    folder: Option<PathBuf>,
    db: Option<PathBuf>,
) -> Result<()> {
    let config = config::snapshot();
    let folder = folder.unwrap_or_else(|| default_folder(kind, &config));
    let db = db.unwrap_or_else(|| default_db(kind, &config));

    let summary = chaindecode_engine::decode_folder(kind, &folder, &db, &config)
        .await
        .with_context(|| format!("decode folder '{}'", folder.display()))?;

    println!(
        "Decoded {}/{} files from '{}'",
        summary.decoded_files,
        summary.total_files,
        folder.display()
    );
    for (file, error) in &summary.failures {
        eprintln!("  ✗ {}: {}", file.display(), error);
    }
    if !summary.failures.is_empty() {
        bail!("{} files failed to decode", summary.failures.len());
    }
    Ok(())
}

async fn cmd_decode_file(
    kind: DecoderKind,
    file: PathBuf,
    db: Option<PathBuf>,
) -> Result<()> {
    let config = config::snapshot();
    let db = db.unwrap_or_else(|| default_db(kind, &config));
    let decoded = chaindecode_engine::decode_file(kind, &file, &db, &config)
        .await
        .with_context(|| format!("decode file '{}'", file.display()))?;
    println!("Decoded {} rows from '{}'", decoded.height(), file.display());
    println!("{}", decoded.head(Some(10)));
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    println!("{}", config::get_config()?);
    Ok(())
}

/// Parse a CLI value string into the matching config value type:
/// booleans, integers, comma-separated lists, then plain strings.
fn parse_config_value(value: &str) -> ConfigValue {
    if let Ok(b) = value.parse::<bool>() {
        return ConfigValue::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return ConfigValue::Int(i);
    }
    if value.contains(',') {
        return ConfigValue::List(
            value.split(',').map(|s| s.trim().to_string()).collect(),
        );
    }
    ConfigValue::Str(value.to_string())
}

fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config(key, parse_config_value(value))
        .with_context(|| format!("set '{key}'"))?;
    println!("{key} updated");
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("ChainDecode v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Event log decoding        (alloy dyn-abi)");
    println!("  ✓ Call trace decoding       (input + output tuples)");
    println!("  ✓ Flat ABI catalog          (parquet, deduplicated)");
    println!("  ✓ Chunked parallel decode   (rayon)");
    println!("  ✓ Bounded file concurrency  (tokio semaphore)");
    println!("  ✓ Remote single-contract ABI fetch (Sourcify)");
    println!();
    println!("Output formats:              parquet, csv");
    println!("Supported chains:            any EVM-compatible chain");
    Ok(())
}
