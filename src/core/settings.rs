//! Key/value storage for the opaque application settings blob

use crate::envelope::Settings;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable home of the settings object carried in every export
pub trait SettingsStore {
    /// Current settings (empty when nothing has been saved)
    fn load(&self) -> Result<Settings>;

    /// Replace the stored settings
    fn save(&mut self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    settings: Settings,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        MemorySettings { settings }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Settings> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        self.settings = settings.clone();
        Ok(())
    }
}

/// Settings kept in a JSON file, written atomically
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileSettings {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        let text = serde_json::to_string_pretty(settings)?;

        // Write next to the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved {} settings to {:?}", settings.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Settings {
        let mut settings = Settings::new();
        settings.insert("theme".into(), json!("dark"));
        settings.insert("fontSize".into(), json!(14));
        settings
    }

    #[test]
    fn test_memory_settings() {
        let mut store = MemorySettings::default();
        assert!(store.load().unwrap().is_empty());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileSettings::new(dir.path().join("settings.json"));

        assert!(store.load().unwrap().is_empty());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(JsonFileSettings::new(&path).load().is_err());
    }
}
