//! Plugin hosting core for AudioShaper.
//!
//! Third-party effect plugins live on nodes of the processing graph. This
//! crate turns the references stored on those nodes into running instances,
//! renders them from the real-time thread, and exposes their parameters,
//! state and editors to the application.
//!
//! * [`PluginHostRegistry`] maps graph nodes to hosted instances and keeps the
//!   mapping consistent with the graph.
//! * [`PluginInstance`] is the capability interface every backend implements.
//! * [`AudioUnitInstance`] hosts native audio units through the
//!   [`NativeUnit`]/[`ComponentInstantiator`] seam; [`Vst3Instance`] is an inert
//!   placeholder.
//! * [`ControlQueue`] is the control thread's task queue. Reconfiguration,
//!   ready notifications and editor delivery all run there.

mod audio_buffer;
mod control;
mod descriptor;
mod editor;
mod error;
pub mod formats;
mod graph;
mod instance;
mod parameters;
mod registry;
mod settings;

pub use audio_buffer::AudioBuffer;
pub use control::{ControlHandle, ControlQueue, ControlTask};
pub use descriptor::{ComponentKey, FourCc, PluginDescriptor, PluginFormat, PluginReference};
pub use editor::{EditorContent, EditorPresenter, WindowId};
pub use error::HostError;
pub use formats::audio_unit::native::{
    BufferList, BusScope, ComponentInstantiator, NativeParameter, NativeUnit, OsStatus,
    ParameterHandle, ParameterNode, PullInput, RenderTimestamp, StateDictionary, StateValue,
    StreamFormat, ViewHandle, ViewReply,
};
pub use formats::audio_unit::{AudioUnitInstance, MAX_FRAMES_PER_SLICE};
pub use formats::{HostedPlugin, Vst3Instance};
pub use graph::{GraphNode, NodeId, NodeKind};
pub use instance::{AudioFormat, PluginInstance, ReadyCallback};
pub use parameters::PluginParameter;
pub use registry::{PluginHostRegistry, ReadyListener};
pub use settings::HostSettings;
