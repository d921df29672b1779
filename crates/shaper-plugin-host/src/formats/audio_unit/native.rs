//! Boundary to the operating system's audio-unit hosting facility.
//!
//! Everything the backend needs from a live native unit goes through
//! [`NativeUnit`]; instantiation by component key goes through
//! [`ComponentInstantiator`]. Platform bindings implement these traits, and
//! tests substitute scripted units.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::ComponentKey;
use crate::error::HostError;

/// Native status code. Zero means success.
pub type OsStatus = i32;

pub const NO_ERR: OsStatus = 0;
/// `kAudioUnitErr_FormatNotSupported`.
pub const ERR_FORMAT_NOT_SUPPORTED: OsStatus = -10868;
/// `kAudioUnitErr_NoConnection`.
pub const ERR_NO_CONNECTION: OsStatus = -10876;

/// Input or output side of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusScope {
    Input,
    Output,
}

/// Non-interleaved 32-bit float stream description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: u32,
    pub interleaved: bool,
}

impl StreamFormat {
    pub fn non_interleaved_f32(sample_rate: f64, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved: false,
        }
    }
}

/// Timestamp handed to every render call. `sample_time` is the only
/// playback position a unit sees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderTimestamp {
    pub sample_time: f64,
}

/// List of per-channel sample buffers passed across the render boundary.
///
/// Output lists borrow the caller's channel storage directly; input lists
/// borrow buffers owned by the unit.
pub struct BufferList<'a, 'b> {
    buffers: &'b mut [&'a mut [f32]],
}

impl<'a, 'b> BufferList<'a, 'b> {
    pub fn new(buffers: &'b mut [&'a mut [f32]]) -> Self {
        Self { buffers }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Mutable access to every channel buffer in the list.
    pub fn as_mut_slices(&mut self) -> &mut [&'a mut [f32]] {
        &mut *self.buffers
    }
}

/// Callback a unit invokes during rendering to fetch its input samples.
pub type PullInput<'r> = dyn FnMut(&RenderTimestamp, u32, &mut BufferList<'_, '_>) -> OsStatus + 'r;

/// Thread-safe handle onto one live native parameter.
pub trait ParameterHandle: Send + Sync {
    fn value(&self) -> f32;
    fn set_value(&self, value: f32);
}

/// Leaf of the native parameter tree.
#[derive(Clone)]
pub struct NativeParameter {
    pub address: u64,
    pub identifier: String,
    pub display_name: String,
    pub min: f32,
    pub max: f32,
    pub unit_name: Option<String>,
    pub writable: bool,
    pub handle: Arc<dyn ParameterHandle>,
}

impl std::fmt::Debug for NativeParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeParameter")
            .field("address", &self.address)
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Node of the native parameter tree.
#[derive(Debug, Clone)]
pub enum ParameterNode {
    Group {
        name: String,
        children: Vec<ParameterNode>,
    },
    Parameter(NativeParameter),
}

/// Property-list value inside a unit's full state dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    Data(Vec<u8>),
    Array(Vec<StateValue>),
    Dictionary(StateDictionary),
}

pub type StateDictionary = BTreeMap<String, StateValue>;

/// Opaque platform view handle handed back to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

pub type ViewReply = Box<dyn FnOnce(Option<ViewHandle>) + Send + 'static>;

/// One instantiated native unit.
pub trait NativeUnit: Send {
    /// Output channel counts the unit accepts. `None` means any count.
    fn supported_output_channel_counts(&self) -> Option<Vec<u32>>;
    fn set_maximum_frames_to_render(&mut self, frames: u32);
    fn set_bus_format(&mut self, scope: BusScope, format: &StreamFormat) -> Result<(), OsStatus>;
    fn set_bus_enabled(&mut self, scope: BusScope, enabled: bool) -> Result<(), OsStatus>;
    fn allocate_render_resources(&mut self) -> Result<(), OsStatus>;
    fn deallocate_render_resources(&mut self);
    fn reset(&mut self);

    /// The unit's render entry point. Output buffers may be written in place;
    /// input is obtained, zero or more times, through `pull_input`.
    fn render(
        &mut self,
        timestamp: &RenderTimestamp,
        frames: u32,
        output: &mut BufferList<'_, '_>,
        pull_input: &mut PullInput<'_>,
    ) -> OsStatus;

    fn parameter_tree(&self) -> Vec<ParameterNode>;

    fn full_state(&self) -> Option<StateDictionary>;
    fn set_full_state(&mut self, state: StateDictionary) -> Result<(), OsStatus>;

    /// View already created by the unit, if any.
    fn view(&self) -> Option<ViewHandle>;
    /// Asks the unit to build its custom view. Poorly behaved units may
    /// never call `reply`.
    fn request_view(&mut self, reply: ViewReply);
}

/// Resolves component keys into live units. Called only from the
/// background instantiation worker, so implementations may block.
pub trait ComponentInstantiator: Send + Sync {
    fn instantiate(&self, key: &ComponentKey) -> Result<Box<dyn NativeUnit>, HostError>;
}
