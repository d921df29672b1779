use tracing::debug;

use crate::audio_buffer::AudioBuffer;
use crate::descriptor::PluginReference;
use crate::formats::audio_unit::native::ViewHandle;
use crate::instance::{PluginInstance, ReadyCallback};
use crate::parameters::PluginParameter;

/// Placeholder for VST3 plugins.
///
/// No engine is wired yet: the instance never becomes ready and leaves audio
/// untouched, so the registry and render path need no format checks.
pub struct Vst3Instance {
    reference: PluginReference,
}

impl Vst3Instance {
    pub fn new(reference: PluginReference) -> Self {
        debug!(identifier = %reference.identifier, "vst3 hosting not available, node will pass audio through");
        Self { reference }
    }
}

impl PluginInstance for Vst3Instance {
    fn reference(&self) -> &PluginReference {
        &self.reference
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn on_ready(&self, _callback: ReadyCallback) {}

    fn ensure_format(&self, _sample_rate: f64, _channels: u32) {}

    fn process(&self, _buffer: &mut AudioBuffer, _frames: usize, _sample_rate: f64, _channels: u32) {}

    fn parameters(&self) -> Vec<PluginParameter> {
        Vec::new()
    }

    fn set_parameter(&self, _id: &str, _value: f64) {}

    fn state_data(&self) -> Option<Vec<u8>> {
        None
    }

    fn load_state(&self, _blob: &[u8]) {}

    fn editor_view(&self) -> Option<ViewHandle> {
        None
    }
}
