#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use shaper_plugin_host::formats::audio_unit::native::{ERR_FORMAT_NOT_SUPPORTED, NO_ERR};
use shaper_plugin_host::{
    BufferList, BusScope, ComponentInstantiator, ComponentKey, ControlQueue, FourCc, HostError,
    NativeParameter, NativeUnit, OsStatus, ParameterHandle, ParameterNode, PluginDescriptor,
    PluginReference, PullInput, RenderTimestamp, StateDictionary, StateValue, StreamFormat,
    ViewHandle, ViewReply,
};

pub const WAIT: Duration = Duration::from_secs(5);

const ERR_ALLOCATION: OsStatus = -108;

/// How a fake unit answers custom view requests.
#[derive(Debug, Clone, Copy)]
pub enum ViewBehavior {
    Immediate(ViewHandle),
    NoView,
    /// Keeps the reply forever.
    Never,
    /// Drops the reply without answering.
    Abandoned,
    Delayed(Duration, ViewHandle),
}

/// Behaviour shared by every unit a [`FakeInstantiator`] produces.
#[derive(Debug, Clone)]
pub struct Script {
    pub supported_channels: Option<Vec<u32>>,
    pub render_status: OsStatus,
    pub rejected_channels: Vec<u32>,
    pub fail_instantiation: bool,
    pub instantiate_delay: Duration,
    /// Number of initial `allocate_render_resources` calls that fail.
    pub failed_allocations: usize,
    pub view: ViewBehavior,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            supported_channels: None,
            render_status: NO_ERR,
            rejected_channels: Vec::new(),
            fail_instantiation: false,
            instantiate_delay: Duration::ZERO,
            failed_allocations: 0,
            view: ViewBehavior::NoView,
        }
    }
}

/// Everything the fakes record, observable after units move into instances.
#[derive(Default)]
pub struct Recorder {
    pub instantiations: AtomicUsize,
    pub allocation_attempts: AtomicUsize,
    /// Successful allocations only.
    pub allocations: AtomicUsize,
    pub deallocations: AtomicUsize,
    pub renders: AtomicUsize,
    pub formats: Mutex<Vec<(BusScope, StreamFormat)>>,
    pub sample_times: Mutex<Vec<f64>>,
    pub state: Mutex<StateDictionary>,
    pub view_requests: AtomicUsize,
    pub parked_replies: Mutex<Vec<ViewReply>>,
}

impl Recorder {
    pub fn output_formats(&self) -> Vec<StreamFormat> {
        self.formats
            .lock()
            .iter()
            .filter(|(scope, _)| *scope == BusScope::Output)
            .map(|(_, format)| *format)
            .collect()
    }
}

pub struct AtomicParam(AtomicU32);

impl AtomicParam {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }
}

impl ParameterHandle for AtomicParam {
    fn value(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::SeqCst))
    }

    fn set_value(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }
}

/// Gain effect: output = input * `gain` parameter.
pub struct FakeUnit {
    script: Script,
    recorder: Arc<Recorder>,
    gain: Arc<AtomicParam>,
    meter: Arc<AtomicParam>,
}

impl NativeUnit for FakeUnit {
    fn supported_output_channel_counts(&self) -> Option<Vec<u32>> {
        self.script.supported_channels.clone()
    }

    fn set_maximum_frames_to_render(&mut self, _frames: u32) {}

    fn set_bus_format(&mut self, scope: BusScope, format: &StreamFormat) -> Result<(), OsStatus> {
        if self.script.rejected_channels.contains(&format.channels) {
            return Err(ERR_FORMAT_NOT_SUPPORTED);
        }
        self.recorder.formats.lock().push((scope, *format));
        Ok(())
    }

    fn set_bus_enabled(&mut self, _scope: BusScope, _enabled: bool) -> Result<(), OsStatus> {
        Ok(())
    }

    fn allocate_render_resources(&mut self) -> Result<(), OsStatus> {
        let attempt = self.recorder.allocation_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.script.failed_allocations {
            return Err(ERR_ALLOCATION);
        }
        self.recorder.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn deallocate_render_resources(&mut self) {
        self.recorder.deallocations.fetch_add(1, Ordering::SeqCst);
    }

    fn reset(&mut self) {}

    fn render(
        &mut self,
        timestamp: &RenderTimestamp,
        frames: u32,
        output: &mut BufferList<'_, '_>,
        pull_input: &mut PullInput<'_>,
    ) -> OsStatus {
        self.recorder.renders.fetch_add(1, Ordering::SeqCst);
        self.recorder.sample_times.lock().push(timestamp.sample_time);
        if self.script.render_status != NO_ERR {
            for channel in output.as_mut_slices().iter_mut() {
                channel.fill(1.0);
            }
            return self.script.render_status;
        }

        let mut pulled = vec![vec![0.0f32; frames as usize]; output.len()];
        let mut slices: Vec<&mut [f32]> = pulled.iter_mut().map(Vec::as_mut_slice).collect();
        let status = pull_input(timestamp, frames, &mut BufferList::new(&mut slices));
        if status != NO_ERR {
            return status;
        }
        let gain = self.gain.value();
        for (out, input) in output.as_mut_slices().iter_mut().zip(&pulled) {
            for (o, i) in out.iter_mut().zip(input) {
                *o = i * gain;
            }
        }
        NO_ERR
    }

    fn parameter_tree(&self) -> Vec<ParameterNode> {
        vec![ParameterNode::Group {
            name: "Main".into(),
            children: vec![
                ParameterNode::Parameter(NativeParameter {
                    address: 0,
                    identifier: "gain".into(),
                    display_name: "Gain".into(),
                    min: 0.0,
                    max: 2.0,
                    unit_name: Some("x".into()),
                    writable: true,
                    handle: self.gain.clone(),
                }),
                ParameterNode::Parameter(NativeParameter {
                    address: 1,
                    identifier: "meter".into(),
                    display_name: "Meter".into(),
                    min: 0.0,
                    max: 1.0,
                    unit_name: None,
                    writable: false,
                    handle: self.meter.clone(),
                }),
            ],
        }]
    }

    fn full_state(&self) -> Option<StateDictionary> {
        let mut state = self.recorder.state.lock().clone();
        state.insert("gain".into(), StateValue::Real(f64::from(self.gain.value())));
        Some(state)
    }

    fn set_full_state(&mut self, state: StateDictionary) -> Result<(), OsStatus> {
        if let Some(StateValue::Real(gain)) = state.get("gain") {
            self.gain.set_value(*gain as f32);
        }
        *self.recorder.state.lock() = state;
        Ok(())
    }

    fn view(&self) -> Option<ViewHandle> {
        match self.script.view {
            ViewBehavior::Immediate(view) | ViewBehavior::Delayed(_, view) => Some(view),
            ViewBehavior::NoView | ViewBehavior::Never | ViewBehavior::Abandoned => None,
        }
    }

    fn request_view(&mut self, reply: ViewReply) {
        self.recorder.view_requests.fetch_add(1, Ordering::SeqCst);
        match self.script.view {
            ViewBehavior::Immediate(view) => reply(Some(view)),
            ViewBehavior::NoView => reply(None),
            ViewBehavior::Never => self.recorder.parked_replies.lock().push(reply),
            ViewBehavior::Abandoned => drop(reply),
            ViewBehavior::Delayed(delay, view) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    reply(Some(view));
                });
            }
        }
    }
}

pub struct FakeInstantiator {
    pub script: Script,
    pub recorder: Arc<Recorder>,
}

impl FakeInstantiator {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            recorder: Arc::new(Recorder::default()),
        })
    }
}

impl ComponentInstantiator for FakeInstantiator {
    fn instantiate(&self, key: &ComponentKey) -> Result<Box<dyn NativeUnit>, HostError> {
        thread::sleep(self.script.instantiate_delay);
        self.recorder.instantiations.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_instantiation {
            return Err(HostError::ComponentNotFound(*key));
        }
        Ok(Box::new(FakeUnit {
            script: self.script.clone(),
            recorder: Arc::clone(&self.recorder),
            gain: Arc::new(AtomicParam::new(1.0)),
            meter: Arc::new(AtomicParam::new(0.0)),
        }))
    }
}

pub fn gain_key() -> ComponentKey {
    ComponentKey::effect(FourCc::from_bytes(*b"gain"), FourCc::from_bytes(*b"Acme"))
}

pub fn first_party_key() -> ComponentKey {
    ComponentKey::effect(FourCc::from_bytes(*b"dely"), FourCc::from_bytes(*b"appl"))
}

pub fn reference_for(key: ComponentKey) -> PluginReference {
    PluginDescriptor::audio_unit(format!("au.{key}"), "Gain", "Acme", key).reference()
}

pub fn wait_for(queue: &ControlQueue, mut condition: impl FnMut() -> bool) -> bool {
    queue.run_until(WAIT, &mut condition)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
