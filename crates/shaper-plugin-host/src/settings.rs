use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::descriptor::{ComponentKey, FourCc};
use crate::error::HostError;

/// Persisted plugin-host settings stored on disk.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// User-added plugin search folders.
    pub search_folders: Vec<PathBuf>,
    /// Custom view timeout for first-party vendors, in milliseconds.
    pub first_party_editor_timeout_ms: u64,
    /// Custom view timeout for everyone else, in milliseconds.
    pub third_party_editor_timeout_ms: u64,
    /// Manufacturer codes treated as first-party.
    pub first_party_manufacturers: Vec<FourCc>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            search_folders: Vec::new(),
            first_party_editor_timeout_ms: 2_000,
            third_party_editor_timeout_ms: 6_000,
            first_party_manufacturers: vec![FourCc::from_bytes(*b"appl")],
        }
    }
}

impl HostSettings {
    /// Adds a folder unless it is already listed. Returns true when added.
    pub fn add_search_folder(&mut self, folder: impl Into<PathBuf>) -> bool {
        let folder = folder.into();
        if self.search_folders.contains(&folder) {
            return false;
        }
        self.search_folders.push(folder);
        true
    }

    pub fn remove_search_folder(&mut self, folder: &Path) -> bool {
        let before = self.search_folders.len();
        self.search_folders.retain(|existing| existing != folder);
        self.search_folders.len() != before
    }

    /// Timeout for an asynchronous custom view request.
    ///
    /// References without a component key are treated as third-party.
    pub fn editor_timeout(&self, key: Option<&ComponentKey>) -> Duration {
        let first_party = key.is_some_and(|key| key.is_first_party(&self.first_party_manufacturers));
        if first_party {
            Duration::from_millis(self.first_party_editor_timeout_ms)
        } else {
            Duration::from_millis(self.third_party_editor_timeout_ms)
        }
    }

    /// Reads settings from `path`.
    pub fn load_from(path: &Path) -> Result<Self, HostError> {
        let contents = fs::read_to_string(path).map_err(|source| HostError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: HostSettings = serde_json::from_str(&contents)?;
        settings.dedup_search_folders();
        Ok(settings)
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), HostError> {
        let io_error = |source| HostError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_error)
    }

    /// Load settings from the user config directory. Returns defaults if loading fails.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!(%err, "using default plugin host settings");
                Self::default()
            }
        }
    }

    /// Save settings to the user config directory.
    pub fn save(&self) {
        let Some(path) = settings_path() else {
            return;
        };
        if let Err(err) = self.save_to(&path) {
            tracing::warn!(%err, "failed to write plugin host settings");
        }
    }

    fn dedup_search_folders(&mut self) {
        let mut seen = Vec::with_capacity(self.search_folders.len());
        self.search_folders.retain(|folder| {
            if seen.contains(folder) {
                false
            } else {
                seen.push(folder.clone());
                true
            }
        });
    }
}

fn settings_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push("AudioShaper");
    base.push("plugin-host.json");
    Some(base)
}
