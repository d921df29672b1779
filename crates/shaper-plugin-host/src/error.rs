use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::{ComponentKey, PluginFormat};
use crate::formats::audio_unit::native::OsStatus;

/// Errors that can occur while instantiating or configuring hosted plugins.
///
/// None of these ever cross the [`PluginInstance`](crate::PluginInstance)
/// boundary; backends log them and degrade to dry passthrough instead.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("plugin reference for {0:?} carries no component key")]
    MissingComponentKey(PluginFormat),
    #[error("no component registered for {0}")]
    ComponentNotFound(ComponentKey),
    #[error("failed to instantiate {key}: status {status}")]
    Instantiation { key: ComponentKey, status: OsStatus },
    #[error("{operation} failed with status {status}")]
    Native {
        operation: &'static str,
        status: OsStatus,
    },
    #[error("no supported channel count reported by the unit")]
    NoChannelLayout,
    #[error("plugin state codec error: {0}")]
    StateCodec(#[from] bincode::Error),
    #[error("failed to access settings at {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

impl HostError {
    pub(crate) fn native(operation: &'static str, status: OsStatus) -> Self {
        HostError::Native { operation, status }
    }
}
