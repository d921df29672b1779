use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Plugin formats the host knows how to place on a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginFormat {
    /// Native audio-unit components resolved by component key.
    AudioUnit,
    /// Steinberg VST3 bundles. Only a stub backend exists for this format.
    Vst3,
}

impl PluginFormat {
    pub fn label(self) -> &'static str {
        match self {
            PluginFormat::AudioUnit => "AU",
            PluginFormat::Vst3 => "VST3",
        }
    }
}

impl fmt::Display for PluginFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Four-character code used by the component registry (`'aufx'`, `'appl'`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FourCc(pub u32);

impl FourCc {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        FourCc(u32::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for byte in bytes {
                write!(f, "{}", byte as char)?;
            }
            Ok(())
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

impl FromStr for FourCc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !s.is_ascii() {
            return Err(format!("'{s}' is not a four-character code"));
        }
        Ok(FourCc::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// `(type, subtype, manufacturer)` triple identifying a native unit implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentKey {
    pub component_type: FourCc,
    pub subtype: FourCc,
    pub manufacturer: FourCc,
}

impl ComponentKey {
    /// `kAudioUnitType_Effect`.
    pub const TYPE_EFFECT: FourCc = FourCc::from_bytes(*b"aufx");

    pub fn new(component_type: FourCc, subtype: FourCc, manufacturer: FourCc) -> Self {
        Self {
            component_type,
            subtype,
            manufacturer,
        }
    }

    pub fn effect(subtype: FourCc, manufacturer: FourCc) -> Self {
        Self::new(Self::TYPE_EFFECT, subtype, manufacturer)
    }

    /// Returns true when the manufacturer code is one of the given first-party codes.
    pub fn is_first_party(&self, first_party: &[FourCc]) -> bool {
        first_party.contains(&self.manufacturer)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type, self.subtype, self.manufacturer
        )
    }
}

/// Discovered-plugin record handed over by the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub format: PluginFormat,
    pub identifier: String,
    pub name: String,
    pub vendor: String,
    pub component_key: Option<ComponentKey>,
    pub has_custom_ui: Option<bool>,
    pub path: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn audio_unit(
        identifier: impl Into<String>,
        name: impl Into<String>,
        vendor: impl Into<String>,
        key: ComponentKey,
    ) -> Self {
        Self {
            format: PluginFormat::AudioUnit,
            identifier: identifier.into(),
            name: name.into(),
            vendor: vendor.into(),
            component_key: Some(key),
            has_custom_ui: None,
            path: None,
        }
    }

    pub fn vst3(
        identifier: impl Into<String>,
        name: impl Into<String>,
        vendor: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            format: PluginFormat::Vst3,
            identifier: identifier.into(),
            name: name.into(),
            vendor: vendor.into(),
            component_key: None,
            has_custom_ui: None,
            path: Some(path.into()),
        }
    }

    /// Builds a fresh reference, without saved state, for placing on a graph node.
    pub fn reference(&self) -> PluginReference {
        PluginReference {
            format: self.format,
            identifier: self.identifier.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            component_key: self.component_key,
            has_custom_ui: self.has_custom_ui,
            path: self.path.clone(),
            state: None,
        }
    }
}

/// Persisted handle to an instantiated plugin, placed on a graph node.
///
/// Equality covers every identity field and the state blob. The registry
/// relies on it to decide whether a node's instance can be kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginReference {
    pub format: PluginFormat,
    pub identifier: String,
    pub name: String,
    pub vendor: String,
    pub component_key: Option<ComponentKey>,
    pub has_custom_ui: Option<bool>,
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<u8>>,
}

impl PluginReference {
    pub fn with_state(mut self, state: Option<Vec<u8>>) -> Self {
        self.state = state;
        self
    }
}
