//! statusbox - Find, cache and keep ephemeral status media.
//!
//! Usage:
//!   statusbox scan             Discover status media
//!   statusbox grant DIR        Grant a directory and scan it
//!   statusbox saved            List saved copies
//!   statusbox save ID          Save a discovered record
//!   statusbox delete PATH      Delete a saved copy
//!   statusbox forget           Forget the granted directory
//!   statusbox --help           Show help

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use statusbox_core::{BoxFuture, DirectoryChooser, PermissionGate, ScannerConfig, ScopedHandle};
use statusbox_ops::StatusLibrary;
use statusbox_scan::{
    Capabilities, LocalFs, LocalTreeAccess, MediaRecord, ScanEvent, TomlFileStore,
};

#[derive(Parser)]
#[command(
    name = "statusbox",
    version,
    about = "Find, cache and keep ephemeral status media",
    long_about = "statusbox finds the status media a messaging app leaves in shared storage.\n\n\
                  Known folders are probed directly. When none are readable, grant the \
                  folder once with `statusbox grant DIR`; later scans reuse it."
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/statusbox/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover status media
    Scan {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grant a directory for scoped access, remember it, and scan it
    Grant {
        /// Directory to grant
        dir: PathBuf,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved copies
    Saved {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan, then save the record with this id
    Save {
        /// Record id as printed by `scan`
        id: String,
    },

    /// Delete a saved copy by path or file:// URI
    Delete {
        /// Path to delete
        path: String,
    },

    /// Forget the granted directory
    Forget,
}

/// Chooser that hands back the directory given on the command line.
struct PresetChooser(Option<PathBuf>);

impl DirectoryChooser for PresetChooser {
    fn choose(&self) -> BoxFuture<'_, io::Result<Option<ScopedHandle>>> {
        Box::pin(async move {
            match &self.0 {
                Some(dir) => {
                    let dir = tokio::fs::canonicalize(dir).await?;
                    Ok(Some(LocalTreeAccess::handle_for(dir)))
                }
                None => Ok(None),
            }
        })
    }
}

/// A desktop process has no runtime storage prompt.
struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn check_and_request(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let grant = match &cli.command {
        Command::Grant { dir, .. } => Some(dir.clone()),
        _ => None,
    };
    let library = build_library(config, grant);

    match cli.command {
        Command::Scan { json } => run_scan(&library, json).await?,
        Command::Grant { dir, json } => run_grant(&library, &dir, json).await?,
        Command::Saved { json } => run_saved(&library, json).await?,
        Command::Save { id } => run_save(&library, &id).await?,
        Command::Delete { path } => {
            library
                .delete(&path)
                .await
                .with_context(|| format!("Failed to delete {path}"))?;
            println!("Deleted {path}");
        }
        Command::Forget => {
            library.forget_handle().await;
            println!("Forgot the granted directory");
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("STATUSBOX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match ScannerConfig::default_path() {
            Some(path) => path,
            None => return Ok(ScannerConfig::default()),
        },
    };
    tracing::debug!(path = %path.display(), "loading config");
    ScannerConfig::load(&path).with_context(|| format!("Invalid config {}", path.display()))
}

fn build_library(config: ScannerConfig, grant: Option<PathBuf>) -> StatusLibrary {
    let caps = Capabilities {
        fs: Arc::new(LocalFs::new()),
        scoped: Arc::new(LocalTreeAccess::new()),
        store: Arc::new(TomlFileStore::new(&config.state_file)),
        chooser: Arc::new(PresetChooser(grant)),
        permissions: Arc::new(AlwaysGranted),
    };
    StatusLibrary::new(config, caps)
}

/// Discover media and print it.
async fn run_scan(library: &StatusLibrary, json: bool) -> Result<()> {
    let mut events = library.subscribe();
    let records = library.scan().await.context("Scan failed")?;

    if drain_handle_required(&mut events) {
        eprintln!("No readable status folder. Grant one with `statusbox grant DIR`.");
    }
    print_records(&records, json)
}

/// Grant a directory, then scan it.
async fn run_grant(library: &StatusLibrary, dir: &Path, json: bool) -> Result<()> {
    let dir = dir.canonicalize().context("Invalid path")?;
    eprintln!("Granting {}...", dir.display());

    let records = library
        .trigger_chooser_and_scan()
        .await
        .context("Scan failed")?;
    if library.remembered_handle().await != Some(LocalTreeAccess::handle_for(&dir)) {
        return Err(eyre!("Could not grant {}", dir.display()));
    }
    print_records(&records, json)
}

async fn run_saved(library: &StatusLibrary, json: bool) -> Result<()> {
    let records = library.list_saved().await;
    print_records(&records, json)
}

/// Scan, then save the record with `id`.
async fn run_save(library: &StatusLibrary, id: &str) -> Result<()> {
    let records = library.scan().await.context("Scan failed")?;
    let record = records
        .iter()
        .find(|r| r.id.as_str() == id)
        .ok_or_else(|| eyre!("No discovered record with id {id}"))?;

    let dest = library
        .save(record)
        .await
        .with_context(|| format!("Failed to save {}", record.name))?;
    println!("Saved {} to {}", record.name, dest.display());
    Ok(())
}

/// True if the attempt asked for a directory grant.
fn drain_handle_required(events: &mut broadcast::Receiver<ScanEvent>) -> bool {
    let mut required = false;
    loop {
        match events.try_recv() {
            Ok(ScanEvent::HandleRequired) => required = true,
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    required
}

fn print_records(records: &[MediaRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!(" No media found.");
        return Ok(());
    }

    println!("{}", "─".repeat(70));
    println!(" {} item(s)", records.len());
    println!("{}", "─".repeat(70));
    for record in records {
        println!(
            " {:<5} {:>10}  {}  {}",
            record.kind,
            format_size(record.size_bytes),
            format_time(record.modified_at_ms),
            record.name
        );
        println!("       id: {}", record.id.as_str());
        println!("       at: {}", record.display);
    }

    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn format_time(epoch_ms: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown".to_string(),
    }
}
