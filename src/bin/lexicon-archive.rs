//! Lexicon Archive CLI
//!
//! Export a lexicon database to a JSON document or PNG image, restore it
//! from either, or inspect an artifact without importing it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lexicon_archive::{
    inspect_bytes, JsonFileSettings, SqliteStore, Stage, Transfer, TransferBuilder,
    TransferConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "lexicon-archive")]
#[command(about = "Export and import lexicon databases as JSON documents or PNG images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the whole lexicon
    Export {
        /// Path to the SQLite lexicon database
        #[arg(long)]
        db: PathBuf,

        /// Settings JSON file [default: <db>.settings.json]
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Write a PNG image instead of a JSON document
        #[arg(long)]
        image: bool,

        /// Display name stamped into the export
        #[arg(long)]
        name: Option<String>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replace the lexicon with the contents of an export
    Import {
        /// Path to the SQLite lexicon database
        #[arg(long)]
        db: PathBuf,

        /// Settings JSON file [default: <db>.settings.json]
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Document or image to import
        file: PathBuf,
    },

    /// Validate an export and print what it contains
    Inspect {
        file: PathBuf,
    },
}

fn settings_path(db: &Path, settings: Option<PathBuf>) -> PathBuf {
    settings.unwrap_or_else(|| db.with_extension("settings.json"))
}

fn report(stage: Stage, fraction: f64, message: Option<&str>) {
    match message {
        Some(message) => debug!("{:>10} {:5.1}% {}", stage, fraction * 100.0, message),
        None => debug!("{:>10} {:5.1}%", stage, fraction * 100.0),
    }
}

fn open(
    db: &Path,
    settings: Option<PathBuf>,
    config: TransferConfig,
) -> Result<Transfer<SqliteStore, JsonFileSettings>> {
    let store = SqliteStore::open(db)
        .with_context(|| format!("failed to open database {}", db.display()))?;
    let settings = JsonFileSettings::new(settings_path(db, settings));
    Ok(TransferBuilder::new(store, settings).config(config).build()?)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Export {
            db,
            settings,
            out,
            image,
            name,
            config,
        } => {
            let config = match config {
                Some(path) => TransferConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => TransferConfig::default(),
            };
            let transfer = open(&db, settings, config)?;

            if image {
                transfer.export_image_to(&out, name.as_deref(), &report)?;
            } else {
                transfer.export_document_to(&out, name.as_deref(), &report)?;
            }
            info!("Export written to {}", out.display());
        }
        Command::Import { db, settings, file } => {
            let transfer = open(&db, settings, TransferConfig::default())?;
            let summary = transfer
                .import_file(&file, &report)
                .with_context(|| format!("failed to import {}", file.display()))?;

            for (collection, rows) in &summary.rows {
                info!("{:>16}: {}", collection, rows);
            }
            info!("Imported {} rows", summary.total_rows());
        }
        Command::Inspect { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = inspect_bytes(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
