//! Bulk replacement of a lexicon store from a validated envelope
//!
//! Restore is destructive: the destination is wiped and rebuilt. The whole
//! replacement runs inside one unit of work on the store, so a failed insert
//! leaves the previous contents in place.
//!
//! ```text
//! begin ─► wipe ─► insert (IMPORT_ORDER) ─► advance sequences ─► commit
//!   │                  │ failure                                   │
//!   │                  └────────────► rollback, return error       ▼
//!   │                                                 persist ─► save settings
//! ```

use crate::envelope::Envelope;
use crate::error::Result;
use crate::progress::{ProgressSink, Stage};
use crate::records::CollectionKind;
use crate::settings::SettingsStore;
use crate::store::LexiconStore;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Overall fraction at which the import stage starts
///
/// Decoding and validation report below this; row inserts fill the rest of
/// the range up to 1.0.
pub const IMPORT_START: f64 = 0.5;

/// What a restore wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Rows inserted per collection, in import order
    pub rows: Vec<(&'static str, usize)>,
}

impl RestoreSummary {
    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|(_, n)| n).sum()
    }

    pub fn rows_for(&self, kind: CollectionKind) -> usize {
        self.rows
            .iter()
            .find(|(name, _)| *name == kind.name())
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Replace the store's contents and settings with the envelope's
pub fn restore(
    envelope: &Envelope,
    store: &mut dyn LexiconStore,
    settings: &mut dyn SettingsStore,
    progress: &dyn ProgressSink,
) -> Result<RestoreSummary> {
    let total = envelope.collections.total_rows();
    info!(
        "Restoring '{}' ({} rows) into lexicon store",
        envelope.display_name, total
    );

    store.begin()?;
    let summary = match replace_contents(envelope, store, progress, total) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Restore failed, rolling back: {}", e);
            if let Err(rollback_err) = store.rollback() {
                warn!("Rollback failed: {}", rollback_err);
            }
            return Err(e);
        }
    };
    store.commit()?;

    store.persist()?;
    settings.save(&envelope.settings)?;

    info!("Restored {} rows", summary.total_rows());
    Ok(summary)
}

fn replace_contents(
    envelope: &Envelope,
    store: &mut dyn LexiconStore,
    progress: &dyn ProgressSink,
    total: usize,
) -> Result<RestoreSummary> {
    store.wipe()?;
    progress.report(Stage::Import, IMPORT_START, None);

    let mut summary = RestoreSummary::default();
    let mut inserted = 0usize;

    for kind in CollectionKind::IMPORT_ORDER {
        let rows = envelope.collections.rows(kind);
        summary.rows.push((kind.name(), rows.len()));
        if rows.is_empty() {
            continue;
        }

        debug!("Inserting {} rows into {}", rows.len(), kind.name());
        for row in &rows {
            store.insert(kind, row)?;
            inserted += 1;
            let done = inserted as f64 / total as f64;
            progress.report(
                Stage::Import,
                IMPORT_START + (1.0 - IMPORT_START) * done,
                Some(kind.name()),
            );
        }
    }

    for kind in CollectionKind::IMPORT_ORDER {
        if let Some(max_id) = envelope.collections.max_id(kind) {
            store.advance_sequence(kind, max_id)?;
        }
    }

    Ok(summary)
}
