// Application settings
// Loaded from ~/.config/weekboard/settings.json
//
// Every section uses #[serde(default)] so a settings file only needs the
// keys the user changed; unknown keys are ignored for forward compatibility.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Grid interaction tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Ceiling for edited hour values (a week has 168 hours).
    pub max_hours: f64,
    /// Rendered width of one week column, in pixels.
    pub column_width: f64,
    /// Extra columns rendered on each side of the viewport.
    pub overscan: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            max_hours: 168.0,
            column_width: 96.0,
            overscan: 3,
        }
    }
}

/// Retry policy for optimistic writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts before rolling back (the first try counts as attempt 1).
    pub max_retries: u32,
    /// Fixed wait between attempts, in milliseconds.
    pub backoff_ms: u64,
    /// Spread retries by ±25% to avoid thundering-herd resubmits.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1000,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Cross-context bus tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Fallback-store poll interval, in milliseconds.
    pub poll_interval_ms: u64,
    /// Override for the fallback store directory (tests, portable mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            store_dir: None,
        }
    }
}

impl BusSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub retry: RetrySettings,
    pub bus: BusSettings,
}

impl Settings {
    /// Path to the settings file: `~/.config/weekboard/settings.json`.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("weekboard").join("settings.json"))
    }

    /// Load settings, falling back to defaults on a missing or unreadable
    /// file. A malformed file also falls back (a bad settings file must
    /// never prevent startup).
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &std::path::Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Save settings, creating the parent directory as needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.grid.max_hours, 168.0);
        assert_eq!(s.retry.max_retries, 3);
        assert_eq!(s.retry.backoff(), Duration::from_millis(1000));
        assert_eq!(s.bus.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "retry": { "max_retries": 5 } }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.retry.max_retries, 5);
        assert_eq!(s.retry.backoff_ms, 1000);
        assert_eq!(s.grid.overscan, 3);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut s = Settings::default();
        s.grid.column_width = 120.0;
        s.bus.poll_interval_ms = 250;
        s.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.grid.column_width, 120.0);
        assert_eq!(loaded.bus.poll_interval_ms, 250);
    }

    #[test]
    fn test_malformed_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load_from(&path).is_none());
    }
}
