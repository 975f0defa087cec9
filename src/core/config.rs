//! Export configuration
//!
//! Loaded from TOML; every field has a default, so an empty file is valid.
//!
//! ```toml
//! compression_level = 9
//! display_name = "Kēlen Lexicon"
//! max_payload_bytes = 67108864
//!
//! [decoration]
//! background = [244, 239, 225]
//! border = [59, 47, 92]
//! border_width = 4
//! ```

use crate::compression::{CompressionConfig, DEFAULT_LEVEL, MAX_DECOMPRESSED_LEN};
use crate::container::Decoration;
use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Gzip level for image exports (0-9)
    pub compression_level: u32,

    /// Name stamped into exports when the caller does not give one
    pub display_name: String,

    /// Cosmetic frame of image exports
    pub decoration: Decoration,

    /// Largest decompressed envelope an image import will inflate
    pub max_payload_bytes: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            compression_level: DEFAULT_LEVEL,
            display_name: "Lexicon".to_string(),
            decoration: Decoration::default(),
            max_payload_bytes: MAX_DECOMPRESSED_LEN,
        }
    }
}

impl TransferConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TransferConfig =
            toml::from_str(text).map_err(|e| ArchiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.compression()?;
        if self.max_payload_bytes == 0 {
            return Err(ArchiveError::Config(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        self.decoration.validate()
    }

    pub fn compression(&self) -> Result<CompressionConfig> {
        CompressionConfig::with_level(self.compression_level)
    }
}
