//! # Lexicon Archive - Portable Lexicon Export and Import
//!
//! `lexicon-archive` moves a whole lexicon database in and out of a single
//! file. Two artifact kinds carry the same versioned envelope:
//!
//! - **Document**: pretty-printed JSON (`*.lexicon.json`)
//! - **Image**: a PNG whose pixels losslessly embed the gzip-compressed,
//!   checksummed envelope inside a decorative frame
//!
//! Import validates every layer before it touches the destination, then
//! replaces the store's contents in foreign-key order inside one unit of work.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lexicon_archive::{JsonFileSettings, NoProgress, Result, SqliteStore, Transfer};
//!
//! # fn main() -> Result<()> {
//! let store = SqliteStore::open("lexicon.db")?;
//! let settings = JsonFileSettings::new("settings.json");
//! let transfer = Transfer::new(store, settings);
//!
//! // Export as a PNG
//! let png = transfer.export_image(Some("My Conlang"), &NoProgress)?;
//!
//! // Restore it later
//! let summary = transfer.import_image(&png, &NoProgress)?;
//! println!("restored {} rows", summary.total_rows());
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress
//!
//! Every entry point takes a [`ProgressSink`]. Closures work directly:
//!
//! ```rust,no_run
//! # use lexicon_archive::{MemorySettings, MemoryStore, Stage, Transfer};
//! # let transfer = Transfer::new(MemoryStore::new(), MemorySettings::default());
//! let text = transfer
//!     .export_document(None, &|stage: Stage, fraction: f64, _msg: Option<&str>| {
//!         println!("{stage}: {:.0}%", fraction * 100.0);
//!     })
//!     .unwrap();
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    checksum, compression, config, container, envelope, error, frame, pipeline, progress,
    records, restore, settings, store,
};

// Re-export core types that users need
pub use crate::core::{
    compression::CompressionConfig,
    config::TransferConfig,
    container::Decoration,
    envelope::{ArchiveSummary, Envelope, Settings, DOCUMENT_EXTENSION},
    error::{ArchiveError, FormatError, Result, ValidationError},
    progress::{NoProgress, ProgressSink, Stage},
    records::{CollectionKind, Collections, Value},
    restore::RestoreSummary,
    settings::{JsonFileSettings, MemorySettings, SettingsStore},
    store::{LexiconStore, MemoryStore, SqliteStore},
};

use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

struct Stores<S, T> {
    lexicon: S,
    settings: T,
}

/// Export/import service over one lexicon store and its settings
///
/// The stores sit behind a single lock, so an export never observes a
/// restore half-way through and two restores never interleave.
pub struct Transfer<S: LexiconStore, T: SettingsStore> {
    stores: Mutex<Stores<S, T>>,
    config: TransferConfig,
}

impl<S: LexiconStore, T: SettingsStore> Transfer<S, T> {
    /// Create a service with the default configuration
    pub fn new(store: S, settings: T) -> Self {
        Transfer {
            stores: Mutex::new(Stores {
                lexicon: store,
                settings,
            }),
            config: TransferConfig::default(),
        }
    }

    pub fn builder(store: S, settings: T) -> TransferBuilder<S, T> {
        TransferBuilder::new(store, settings)
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Run `f` against the lexicon store while holding the service lock
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.stores.lock().lexicon)
    }

    /// Run `f` against the settings store while holding the service lock
    pub fn with_settings<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.stores.lock().settings)
    }

    pub fn into_inner(self) -> (S, T) {
        let stores = self.stores.into_inner();
        (stores.lexicon, stores.settings)
    }

    /// Export the whole lexicon as a JSON document
    pub fn export_document(
        &self,
        display_name: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<String> {
        let envelope = self.collect(display_name, progress)?;
        let text = pipeline::encode_document(&envelope, progress)?;
        progress.report(Stage::Done, 1.0, None);
        info!("Exported document ({} bytes)", text.len());
        Ok(text)
    }

    /// Export the whole lexicon as a PNG image
    pub fn export_image(
        &self,
        display_name: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<u8>> {
        let envelope = self.collect(display_name, progress)?;
        let image = pipeline::encode_image(
            &envelope,
            &self.config.compression()?,
            &self.config.decoration,
            progress,
        )?;
        progress.report(Stage::Done, 1.0, None);
        info!("Exported image ({} bytes)", image.len());
        Ok(image)
    }

    /// Replace the lexicon with the contents of a JSON document
    pub fn import_document(
        &self,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> Result<RestoreSummary> {
        let envelope = pipeline::decode_document(text, progress)?;
        self.restore(&envelope, progress)
    }

    /// Replace the lexicon with the contents of a PNG image
    pub fn import_image(&self, image: &[u8], progress: &dyn ProgressSink) -> Result<RestoreSummary> {
        let envelope =
            pipeline::decode_image_limited(image, self.config.max_payload_bytes, progress)?;
        self.restore(&envelope, progress)
    }

    /// Import either artifact kind, told apart by the PNG signature
    pub fn import_bytes(&self, bytes: &[u8], progress: &dyn ProgressSink) -> Result<RestoreSummary> {
        if pipeline::is_image(bytes) {
            self.import_image(bytes, progress)
        } else {
            self.import_document(document_text(bytes)?, progress)
        }
    }

    pub fn export_document_to<P: AsRef<Path>>(
        &self,
        path: P,
        display_name: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let text = self.export_document(display_name, progress)?;
        std::fs::write(path.as_ref(), text)?;
        info!("Wrote document export to {:?}", path.as_ref());
        Ok(())
    }

    pub fn export_image_to<P: AsRef<Path>>(
        &self,
        path: P,
        display_name: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let image = self.export_image(display_name, progress)?;
        std::fs::write(path.as_ref(), image)?;
        info!("Wrote image export to {:?}", path.as_ref());
        Ok(())
    }

    pub fn import_file<P: AsRef<Path>>(
        &self,
        path: P,
        progress: &dyn ProgressSink,
    ) -> Result<RestoreSummary> {
        info!("Importing {:?}", path.as_ref());
        let bytes = std::fs::read(path.as_ref())?;
        self.import_bytes(&bytes, progress)
    }

    fn collect(&self, display_name: Option<&str>, progress: &dyn ProgressSink) -> Result<Envelope> {
        progress.report(Stage::Collect, 0.0, None);
        let stores = self.stores.lock();
        let collections = store::collect(&stores.lexicon)?;
        let settings = stores.settings.load()?;
        drop(stores);

        let name = display_name.unwrap_or(&self.config.display_name);
        debug!(
            "Collected {} rows and {} settings for '{}'",
            collections.total_rows(),
            settings.len(),
            name
        );
        Ok(Envelope::build(collections, settings, name))
    }

    fn restore(&self, envelope: &Envelope, progress: &dyn ProgressSink) -> Result<RestoreSummary> {
        let mut stores = self.stores.lock();
        let Stores { lexicon, settings } = &mut *stores;
        let summary = restore::restore(envelope, lexicon, settings, progress)?;
        progress.report(Stage::Done, 1.0, None);
        Ok(summary)
    }
}

impl Transfer<SqliteStore, JsonFileSettings> {
    /// Service over a SQLite database file and a JSON settings file
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(db: P, settings: Q) -> Result<Self> {
        Ok(Transfer::new(
            SqliteStore::open(db)?,
            JsonFileSettings::new(settings),
        ))
    }
}

fn document_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        ValidationError::InvalidSyntax(format!("document is not UTF-8: {}", e)).into()
    })
}

/// Decode and validate an image artifact without touching any store
pub fn inspect_image(image: &[u8]) -> Result<ArchiveSummary> {
    Ok(pipeline::decode_image(image, &NoProgress)?.summary())
}

/// Decode and validate a document artifact without touching any store
pub fn inspect_document(text: &str) -> Result<ArchiveSummary> {
    Ok(pipeline::decode_document(text, &NoProgress)?.summary())
}

/// Inspect either artifact kind, told apart by the PNG signature
pub fn inspect_bytes(bytes: &[u8]) -> Result<ArchiveSummary> {
    if pipeline::is_image(bytes) {
        inspect_image(bytes)
    } else {
        inspect_document(document_text(bytes)?)
    }
}

#[cfg(feature = "async")]
pub use crate::core::pipeline::{decode_image_async, encode_image_async};

/// Builder for creating Transfer services with custom configuration
///
/// # Examples
///
/// ```rust,no_run
/// use lexicon_archive::{MemorySettings, MemoryStore, TransferBuilder};
///
/// let transfer = TransferBuilder::new(MemoryStore::new(), MemorySettings::default())
///     .compression_level(9)
///     .display_name("Kēlen")
///     .build()?;
/// # Ok::<(), lexicon_archive::ArchiveError>(())
/// ```
pub struct TransferBuilder<S: LexiconStore, T: SettingsStore> {
    store: S,
    settings: T,
    config: TransferConfig,
}

impl<S: LexiconStore, T: SettingsStore> TransferBuilder<S, T> {
    pub fn new(store: S, settings: T) -> Self {
        TransferBuilder {
            store,
            settings,
            config: TransferConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Gzip level for image exports (0-9)
    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Fallback name for exports
    pub fn display_name<N: Into<String>>(mut self, name: N) -> Self {
        self.config.display_name = name.into();
        self
    }

    /// Cap on the decompressed envelope size accepted by image imports
    pub fn max_payload_bytes(mut self, limit: usize) -> Self {
        self.config.max_payload_bytes = limit;
        self
    }

    pub fn decoration(mut self, decoration: Decoration) -> Self {
        self.config.decoration = decoration;
        self
    }

    /// Build the Transfer service, rejecting an invalid configuration
    pub fn build(self) -> Result<Transfer<S, T>> {
        self.config.validate()?;
        debug!(
            "Building transfer service (level {}, name '{}')",
            self.config.compression_level, self.config.display_name
        );

        let mut transfer = Transfer::new(self.store, self.settings);
        transfer.config = self.config;
        Ok(transfer)
    }
}
