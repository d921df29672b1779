use std::time::Duration;

use crate::audio_buffer::AudioBuffer;
use crate::descriptor::PluginReference;
use crate::formats::audio_unit::native::{ViewHandle, ViewReply};
use crate::parameters::PluginParameter;

/// Sample rate and channel count an instance is asked to render at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub sample_rate: f64,
    pub channels: u32,
}

impl AudioFormat {
    pub fn new(sample_rate: f64, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

pub type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

/// Capabilities every hosted plugin backend provides.
///
/// Instances are shared between the render thread, the control thread and
/// the registry, so every method takes `&self`. No method reports failure:
/// a backend that cannot do its job leaves audio untouched and returns empty
/// results.
pub trait PluginInstance: Send + Sync {
    /// The reference this instance was built from.
    fn reference(&self) -> &PluginReference;

    /// True once the native resource finished its asynchronous setup.
    fn is_ready(&self) -> bool;

    /// Registers a callback fired once, on the control thread, when the
    /// instance becomes ready.
    fn on_ready(&self, callback: ReadyCallback);

    /// Requests `sample_rate`/`channels`. Renegotiation may be deferred.
    fn ensure_format(&self, sample_rate: f64, channels: u32);

    /// Renders `frames` frames in place. Leaves `buffer` untouched whenever
    /// real processing is not possible.
    fn process(&self, buffer: &mut AudioBuffer, frames: usize, sample_rate: f64, channels: u32);

    fn parameters(&self) -> Vec<PluginParameter>;

    fn set_parameter(&self, id: &str, value: f64);

    fn state_data(&self) -> Option<Vec<u8>>;

    fn load_state(&self, blob: &[u8]);

    /// Synchronous editor view lookup.
    fn editor_view(&self) -> Option<ViewHandle>;

    /// Whether [`request_editor_view`](Self::request_editor_view) is backed by
    /// a real asynchronous request.
    fn supports_async_editor(&self) -> bool {
        false
    }

    /// Delivers exactly one editor view result to `reply` within `timeout`.
    ///
    /// Asynchronous backends deliver on the control thread. The default
    /// answers immediately with [`editor_view`](Self::editor_view).
    fn request_editor_view(&self, timeout: Duration, reply: ViewReply) {
        let _ = timeout;
        reply(self.editor_view());
    }
}
