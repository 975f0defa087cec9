//! Versioned export document
//!
//! The envelope is the JSON document that both artifact types carry. It is
//! self-identifying (`magic`) and versioned (`schemaVersion`); both are
//! checked before anything else in the document is looked at.
//!
//! ```json
//! {
//!   "magic": "lexicon-archive",
//!   "schemaVersion": 1,
//!   "exportedAt": "2026-10-19T12:00:00+00:00",
//!   "displayName": "Toki Sona",
//!   "settings": { ... },
//!   "collections": { "languages": [ ... ], "words": [ ... ], ... }
//! }
//! ```

use crate::error::{Result, ValidationError};
use crate::records::{CollectionKind, Collections};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

/// Identifies a lexicon export
pub const MAGIC: &str = "lexicon-archive";

/// Current envelope schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Conventional extension for document exports
pub const DOCUMENT_EXTENSION: &str = "lexicon.json";

/// Opaque application settings carried alongside the records
pub type Settings = serde_json::Map<String, Json>;

/// Export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub magic: String,
    pub schema_version: u32,

    /// RFC 3339 export time
    pub exported_at: String,

    /// Human-readable name shown when importing
    pub display_name: String,

    pub settings: Settings,
    pub collections: Collections,
}

impl Envelope {
    /// Stamp magic, schema version and the current time onto a record set
    pub fn build(
        collections: Collections,
        settings: Settings,
        display_name: impl Into<String>,
    ) -> Self {
        Envelope {
            magic: MAGIC.to_string(),
            schema_version: SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            display_name: display_name.into(),
            settings,
            collections,
        }
    }

    /// Counts and identity without the row data
    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            display_name: self.display_name.clone(),
            exported_at: self.exported_at.clone(),
            schema_version: self.schema_version,
            row_counts: CollectionKind::IMPORT_ORDER
                .iter()
                .map(|kind| (kind.name(), self.collections.len(*kind)))
                .collect(),
        }
    }
}

/// What an artifact contains, for display before importing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub display_name: String,
    pub exported_at: String,
    pub schema_version: u32,
    pub row_counts: Vec<(&'static str, usize)>,
}

impl ArchiveSummary {
    pub fn total_rows(&self) -> usize {
        self.row_counts.iter().map(|(_, n)| n).sum()
    }
}

/// Serialize to pretty-printed JSON
pub fn serialize(envelope: &Envelope) -> Result<String> {
    Ok(serde_json::to_string_pretty(envelope)?)
}

/// Parse JSON text without interpreting it
pub fn parse(text: &str) -> Result<Json> {
    serde_json::from_str(text)
        .map_err(|e| ValidationError::InvalidSyntax(e.to_string()).into())
}

/// Check a parsed document and convert it to a typed envelope
///
/// Checks run in a fixed order and stop at the first failure: magic,
/// schema version, collections object, each required collection, settings,
/// then the typed shape of every row.
pub fn validate(raw: Json) -> Result<Envelope> {
    let Json::Object(mut root) = raw else {
        return Err(ValidationError::NotRecognized.into());
    };

    if root.get("magic").and_then(Json::as_str) != Some(MAGIC) {
        return Err(ValidationError::NotRecognized.into());
    }

    match root.get("schemaVersion") {
        Some(v) if v.as_u64() == Some(SCHEMA_VERSION as u64) => {}
        Some(v) => return Err(ValidationError::UnsupportedVersion(v.to_string()).into()),
        None => return Err(ValidationError::UnsupportedVersion("missing".to_string()).into()),
    }

    let Some(Json::Object(mut raw_collections)) = root.remove("collections") else {
        return Err(ValidationError::MissingCollections.into());
    };

    for kind in CollectionKind::IMPORT_ORDER {
        match raw_collections.get(kind.name()) {
            None => return Err(ValidationError::MissingCollection(kind.name()).into()),
            Some(Json::Array(_)) => {}
            Some(_) => return Err(ValidationError::NotAList(kind.name()).into()),
        }
    }

    let Some(Json::Object(settings)) = root.remove("settings") else {
        return Err(ValidationError::MissingSettings.into());
    };

    let mut collections = Collections::default();
    for kind in CollectionKind::IMPORT_ORDER {
        if let Some(Json::Array(items)) = raw_collections.remove(kind.name()) {
            collections.set_json_rows(kind, items)?;
        }
    }
    for unknown in raw_collections.keys() {
        debug!("Ignoring unknown collection '{}'", unknown);
    }

    let exported_at = match root.remove("exportedAt") {
        Some(Json::String(s)) => s,
        _ => {
            return Err(
                ValidationError::MalformedEnvelope("exportedAt must be a string".into()).into(),
            )
        }
    };
    let display_name = match root.remove("displayName") {
        Some(Json::String(s)) => s,
        None | Some(Json::Null) => String::new(),
        Some(_) => {
            return Err(
                ValidationError::MalformedEnvelope("displayName must be a string".into()).into(),
            )
        }
    };

    Ok(Envelope {
        magic: MAGIC.to_string(),
        schema_version: SCHEMA_VERSION,
        exported_at,
        display_name,
        settings,
        collections,
    })
}

/// Parse and validate in one step
pub fn decode(text: &str) -> Result<Envelope> {
    validate(parse(text)?)
}
