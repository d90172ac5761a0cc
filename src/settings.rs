use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TAB_TITLE: &str = "Untitled Note";
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 2000;
pub const TABS_STORAGE_KEY: &str = "notura-tabs";
pub const ACTIVE_TAB_STORAGE_KEY: &str = "notura-active-tab";

// Editor core settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Quiet period before an auto-save snapshot is captured
    pub autosave_delay_ms: u64,
    /// Upper bound on snapshots kept per tab; None keeps everything
    pub max_versions: Option<usize>,
    pub default_tab_title: String,
    pub tabs_storage_key: String,
    pub active_tab_storage_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            max_versions: None,
            default_tab_title: DEFAULT_TAB_TITLE.to_string(),
            tabs_storage_key: TABS_STORAGE_KEY.to_string(),
            active_tab_storage_key: ACTIVE_TAB_STORAGE_KEY.to_string(),
        }
    }
}

impl Settings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Parse settings JSON, falling back to defaults when it is malformed.
    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid settings JSON, using defaults");
            Self::default()
        })
    }

    // Load settings from disk
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            std::fs::read_to_string(path)
                .map(|content| Self::from_json(&content))
                .unwrap_or_default()
        } else {
            Self::default()
        }
    }

    // Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.autosave_delay(), Duration::from_millis(2000));
        assert_eq!(settings.max_versions, None);
        assert_eq!(settings.default_tab_title, "Untitled Note");
        assert_eq!(settings.tabs_storage_key, "notura-tabs");
        assert_eq!(settings.active_tab_storage_key, "notura-active-tab");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{"autosaveDelayMs": 500, "maxVersions": 20}"#);
        assert_eq!(settings.autosave_delay_ms, 500);
        assert_eq!(settings.max_versions, Some(20));
        assert_eq!(settings.default_tab_title, DEFAULT_TAB_TITLE);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        assert_eq!(Settings::from_json("{not json"), Settings::default());
        assert_eq!(
            Settings::from_json(r#"{"autosaveDelayMs": "soon"}"#),
            Settings::default()
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            autosave_delay_ms: 750,
            max_versions: Some(5),
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"autosaveDelayMs\": 750"));
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(&dir.path().join("absent.json")), Settings::default());
    }
}
