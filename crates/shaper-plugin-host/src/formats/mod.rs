//! Format-specific backends behind the [`PluginInstance`] interface.

pub mod audio_unit;
pub mod vst3;

use std::sync::Arc;
use std::time::Duration;

use crate::audio_buffer::AudioBuffer;
use crate::control::ControlHandle;
use crate::descriptor::{PluginFormat, PluginReference};
use crate::instance::{PluginInstance, ReadyCallback};
use crate::parameters::PluginParameter;

use self::audio_unit::native::{ComponentInstantiator, ViewHandle, ViewReply};
pub use self::audio_unit::AudioUnitInstance;
pub use self::vst3::Vst3Instance;

/// A hosted plugin of any supported format.
pub enum HostedPlugin {
    AudioUnit(AudioUnitInstance),
    Vst3(Vst3Instance),
}

impl HostedPlugin {
    /// Builds the backend matching the reference's format. Never blocks.
    pub fn instantiate(
        reference: PluginReference,
        instantiator: &Arc<dyn ComponentInstantiator>,
        control: &ControlHandle,
    ) -> Self {
        match reference.format {
            PluginFormat::AudioUnit => HostedPlugin::AudioUnit(AudioUnitInstance::new(
                reference,
                Arc::clone(instantiator),
                control.clone(),
            )),
            PluginFormat::Vst3 => HostedPlugin::Vst3(Vst3Instance::new(reference)),
        }
    }

    pub fn format(&self) -> PluginFormat {
        match self {
            HostedPlugin::AudioUnit(_) => PluginFormat::AudioUnit,
            HostedPlugin::Vst3(_) => PluginFormat::Vst3,
        }
    }

    fn inner(&self) -> &dyn PluginInstance {
        match self {
            HostedPlugin::AudioUnit(instance) => instance,
            HostedPlugin::Vst3(instance) => instance,
        }
    }
}

impl PluginInstance for HostedPlugin {
    fn reference(&self) -> &PluginReference {
        self.inner().reference()
    }

    fn is_ready(&self) -> bool {
        self.inner().is_ready()
    }

    fn on_ready(&self, callback: ReadyCallback) {
        self.inner().on_ready(callback)
    }

    fn ensure_format(&self, sample_rate: f64, channels: u32) {
        self.inner().ensure_format(sample_rate, channels)
    }

    fn process(&self, buffer: &mut AudioBuffer, frames: usize, sample_rate: f64, channels: u32) {
        self.inner().process(buffer, frames, sample_rate, channels)
    }

    fn parameters(&self) -> Vec<PluginParameter> {
        self.inner().parameters()
    }

    fn set_parameter(&self, id: &str, value: f64) {
        self.inner().set_parameter(id, value)
    }

    fn state_data(&self) -> Option<Vec<u8>> {
        self.inner().state_data()
    }

    fn load_state(&self, blob: &[u8]) {
        self.inner().load_state(blob)
    }

    fn editor_view(&self) -> Option<ViewHandle> {
        self.inner().editor_view()
    }

    fn supports_async_editor(&self) -> bool {
        self.inner().supports_async_editor()
    }

    fn request_editor_view(&self, timeout: Duration, reply: ViewReply) {
        self.inner().request_editor_view(timeout, reply)
    }
}
