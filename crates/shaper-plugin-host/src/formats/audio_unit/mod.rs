//! Audio-unit backend.
//!
//! One [`AudioUnitInstance`] owns exactly one native unit. The unit is
//! instantiated on a background worker, configured on the control thread and
//! rendered on the render thread:
//!
//! ```text
//!  worker ──instantiate──► one-shot ──► control: install unit, apply state, ready
//!  any    ──ensure_format──► latest-request slot ──► control: renegotiate
//!  render ──process──► try_lock(engine) ──► native render, dry on failure
//! ```

pub mod native;
mod params;
mod render;
pub mod state;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, select, Receiver};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use self::native::{
    BusScope, ComponentInstantiator, NativeUnit, StreamFormat, ViewHandle, ViewReply,
    ERR_FORMAT_NOT_SUPPORTED, ERR_NO_CONNECTION,
};
use self::params::ParameterCache;
use self::render::{NegotiatedFormat, RenderState};
use self::state::{decode_state, encode_state};
use crate::audio_buffer::AudioBuffer;
use crate::control::ControlHandle;
use crate::descriptor::{ComponentKey, PluginReference};
use crate::editor::OneShotReply;
use crate::error::HostError;
use crate::instance::{AudioFormat, PluginInstance, ReadyCallback};
use crate::parameters::PluginParameter;

pub use self::render::MAX_FRAMES_PER_SLICE;

type InstantiationResult = Result<Box<dyn NativeUnit>, HostError>;

/// Minimum delay before a format that just failed to negotiate is tried again.
const RENEGOTIATION_BACKOFF: Duration = Duration::from_millis(250);

/// Native unit plus everything the render thread touches.
#[derive(Default)]
struct Engine {
    unit: Option<Box<dyn NativeUnit>>,
    render: RenderState,
}

/// Coalescing slot for format requests.
#[derive(Debug, Default)]
struct FormatSlot {
    negotiated: Option<AudioFormat>,
    requested: Option<AudioFormat>,
    last_failed: Option<(AudioFormat, Instant)>,
    pending: bool,
}

impl FormatSlot {
    /// Whether `requested` needs a negotiation pass. A format that failed
    /// is retried once [`RENEGOTIATION_BACKOFF`] has elapsed.
    fn needs_negotiation(&self, requested: AudioFormat) -> bool {
        if self.negotiated == Some(requested) {
            return false;
        }
        match self.last_failed {
            Some((format, failed_at)) if format == requested => {
                failed_at.elapsed() >= RENEGOTIATION_BACKOFF
            }
            _ => true,
        }
    }
}

struct Shared {
    reference: PluginReference,
    control: ControlHandle,
    ready: AtomicBool,
    reconfigure_pending: AtomicBool,
    generation: AtomicU64,
    format: Mutex<FormatSlot>,
    engine: Mutex<Engine>,
    parameters: Mutex<ParameterCache>,
    ready_callbacks: Mutex<Vec<ReadyCallback>>,
    instantiation: Mutex<Option<Receiver<InstantiationResult>>>,
}

/// Hosted native audio unit.
pub struct AudioUnitInstance {
    shared: Arc<Shared>,
}

impl AudioUnitInstance {
    /// Starts instantiating the unit named by `reference`. Never blocks.
    ///
    /// A reference without a component key produces an instance that stays
    /// not-ready forever.
    pub fn new(
        reference: PluginReference,
        instantiator: Arc<dyn ComponentInstantiator>,
        control: ControlHandle,
    ) -> Self {
        let key = reference.component_key;
        let shared = Arc::new(Shared {
            reference,
            control,
            ready: AtomicBool::new(false),
            reconfigure_pending: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            format: Mutex::new(FormatSlot::default()),
            engine: Mutex::new(Engine::default()),
            parameters: Mutex::new(ParameterCache::default()),
            ready_callbacks: Mutex::new(Vec::new()),
            instantiation: Mutex::new(None),
        });

        match key {
            Some(key) => spawn_instantiation(&shared, key, instantiator),
            None => warn!(
                identifier = %shared.reference.identifier,
                "{}",
                HostError::MissingComponentKey(shared.reference.format)
            ),
        }

        Self { shared }
    }

    /// Format the caller last negotiated successfully.
    pub fn negotiated_format(&self) -> Option<AudioFormat> {
        self.shared.format.lock().negotiated
    }

    /// Channel count the unit actually renders at.
    pub fn render_channels(&self) -> Option<u32> {
        self.shared
            .engine
            .lock()
            .render
            .negotiated
            .map(|negotiated| negotiated.render_channels)
    }

    pub fn is_reconfiguring(&self) -> bool {
        self.shared.reconfigure_pending.load(Ordering::Acquire)
    }

    fn with_parameters<R>(&self, f: impl FnOnce(&mut ParameterCache) -> R) -> Option<R> {
        if !self.is_ready() {
            return None;
        }
        let generation = self.shared.generation.load(Ordering::Acquire);
        let mut cache = self.shared.parameters.lock();
        if !cache.is_current(generation) {
            let tree = self.shared.engine.lock().unit.as_ref()?.parameter_tree();
            cache.rebuild(generation, tree);
            debug!(generation, "parameter tree cached");
        }
        Some(f(&mut cache))
    }
}

fn spawn_instantiation(
    shared: &Arc<Shared>,
    key: ComponentKey,
    instantiator: Arc<dyn ComponentInstantiator>,
) {
    let (tx, rx) = bounded(1);
    *shared.instantiation.lock() = Some(rx);
    let weak = Arc::downgrade(shared);
    let control = shared.control.clone();

    let spawned = thread::Builder::new()
        .name("au-instantiate".into())
        .spawn(move || {
            debug!(%key, "instantiating audio unit");
            let result = instantiator.instantiate(&key);
            if tx.send(result).is_err() {
                debug!(%key, "instance discarded before instantiation finished");
                return;
            }
            control.dispatch(move || {
                if let Some(shared) = Weak::upgrade(&weak) {
                    shared.complete_instantiation();
                }
            });
        });
    if let Err(err) = spawned {
        warn!(%key, %err, "failed to start instantiation worker");
    }
}

impl Shared {
    fn complete_instantiation(&self) {
        let Some(rx) = self.instantiation.lock().take() else {
            return;
        };
        let mut unit = match rx.try_recv() {
            Ok(Ok(unit)) => unit,
            Ok(Err(err)) => {
                warn!(identifier = %self.reference.identifier, %err, "audio unit instantiation failed");
                return;
            }
            Err(_) => {
                warn!(identifier = %self.reference.identifier, "instantiation result missing");
                return;
            }
        };

        if let Some(blob) = &self.reference.state {
            apply_state(&mut *unit, blob);
        }
        self.engine.lock().unit = Some(unit);
        self.generation.fetch_add(1, Ordering::AcqRel);

        let callbacks = {
            let mut callbacks = self.ready_callbacks.lock();
            self.ready.store(true, Ordering::Release);
            std::mem::take(&mut *callbacks)
        };
        info!(
            identifier = %self.reference.identifier,
            name = %self.reference.name,
            "audio unit ready"
        );
        for callback in callbacks {
            callback();
        }
    }

    fn schedule_reconfiguration(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.control.dispatch(move || {
            if let Some(shared) = Weak::upgrade(&weak) {
                shared.run_reconfiguration();
            }
        });
    }

    fn run_reconfiguration(&self) {
        loop {
            let next = self.format.lock().requested.take();
            let Some(format) = next else {
                self.finish_reconfiguration();
                return;
            };

            let result = reconfigure(&mut self.engine.lock(), format);

            let mut slot = self.format.lock();
            match result {
                Ok(render_channels) => {
                    debug!(
                        sample_rate = format.sample_rate,
                        channels = format.channels,
                        render_channels,
                        "audio unit format negotiated"
                    );
                    slot.negotiated = Some(format);
                    slot.last_failed = None;
                    self.generation.fetch_add(1, Ordering::AcqRel);
                }
                Err(err) => {
                    warn!(
                        identifier = %self.reference.identifier,
                        sample_rate = format.sample_rate,
                        channels = format.channels,
                        %err,
                        "audio unit format negotiation failed"
                    );
                    slot.negotiated = None;
                    slot.last_failed = Some((format, Instant::now()));
                }
            }
            if slot.requested.is_none() {
                slot.pending = false;
                self.reconfigure_pending.store(false, Ordering::Release);
                return;
            }
        }
    }

    fn finish_reconfiguration(&self) {
        let mut slot = self.format.lock();
        slot.pending = false;
        self.reconfigure_pending.store(false, Ordering::Release);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(unit) = self.engine.get_mut().unit.as_mut() {
            unit.deallocate_render_resources();
            debug!(identifier = %self.reference.identifier, "audio unit released");
        }
    }
}

fn apply_state(unit: &mut dyn NativeUnit, blob: &[u8]) {
    match decode_state(blob) {
        Ok(state) => {
            if let Err(status) = unit.set_full_state(state) {
                warn!(status, "audio unit rejected saved state");
            }
        }
        Err(err) => debug!(%err, "ignoring malformed plugin state"),
    }
}

/// Picks the channel count the unit will render at.
fn choose_render_channels(supported: Option<Vec<u32>>, requested: u32) -> Result<u32, HostError> {
    let chosen = match supported {
        None => requested,
        Some(counts) if counts.contains(&requested) => requested,
        Some(counts) if counts.contains(&1) => 1,
        Some(counts) => *counts.first().ok_or(HostError::NoChannelLayout)?,
    };
    if (1..=2).contains(&chosen) {
        Ok(chosen)
    } else {
        Err(HostError::native("channel layout", ERR_FORMAT_NOT_SUPPORTED))
    }
}

fn reconfigure(engine: &mut Engine, format: AudioFormat) -> Result<u32, HostError> {
    let Engine { unit, render } = engine;
    render.invalidate();
    let unit = unit
        .as_mut()
        .ok_or_else(|| HostError::native("reconfigure", ERR_NO_CONNECTION))?;

    unit.deallocate_render_resources();
    let render_channels =
        choose_render_channels(unit.supported_output_channel_counts(), format.channels)?;
    unit.set_maximum_frames_to_render(MAX_FRAMES_PER_SLICE as u32);

    let stream = StreamFormat::non_interleaved_f32(format.sample_rate, render_channels);
    for scope in [BusScope::Input, BusScope::Output] {
        unit.set_bus_format(scope, &stream)
            .map_err(|status| HostError::native("set stream format", status))?;
        unit.set_bus_enabled(scope, true)
            .map_err(|status| HostError::native("enable bus", status))?;
    }
    unit.allocate_render_resources()
        .map_err(|status| HostError::native("allocate render resources", status))?;
    unit.reset();

    render.negotiated = Some(NegotiatedFormat {
        requested: format,
        render_channels,
    });
    Ok(render_channels)
}

impl PluginInstance for AudioUnitInstance {
    fn reference(&self) -> &PluginReference {
        &self.shared.reference
    }

    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    fn on_ready(&self, callback: ReadyCallback) {
        let mut callbacks = self.shared.ready_callbacks.lock();
        if self.is_ready() {
            drop(callbacks);
            self.shared.control.dispatch(callback);
        } else {
            callbacks.push(callback);
        }
    }

    fn ensure_format(&self, sample_rate: f64, channels: u32) {
        if !self.is_ready() || !(1..=2).contains(&channels) {
            return;
        }
        let requested = AudioFormat::new(sample_rate, channels);
        let mut slot = self.shared.format.lock();
        if slot.pending {
            slot.requested = Some(requested);
            return;
        }
        if !slot.needs_negotiation(requested) {
            return;
        }
        slot.requested = Some(requested);
        slot.pending = true;
        self.shared.reconfigure_pending.store(true, Ordering::Release);
        drop(slot);
        self.shared.schedule_reconfiguration();
    }

    fn process(&self, buffer: &mut AudioBuffer, frames: usize, sample_rate: f64, channels: u32) {
        if !(1..=2).contains(&channels)
            || !self.is_ready()
            || self.shared.reconfigure_pending.load(Ordering::Acquire)
        {
            return;
        }
        let Some(mut engine) = self.shared.engine.try_lock() else {
            return;
        };
        let Engine { unit, render } = &mut *engine;
        let Some(unit) = unit.as_deref_mut() else {
            return;
        };
        match render.negotiated {
            Some(negotiated) if negotiated.requested == AudioFormat::new(sample_rate, channels) => {
                render.render(unit, buffer, frames);
            }
            _ => {}
        }
    }

    fn parameters(&self) -> Vec<PluginParameter> {
        self.with_parameters(|cache| cache.snapshot())
            .unwrap_or_default()
    }

    fn set_parameter(&self, id: &str, value: f64) {
        self.with_parameters(|cache| cache.set(id, value));
    }

    fn state_data(&self) -> Option<Vec<u8>> {
        if !self.is_ready() {
            return None;
        }
        let state = self.shared.engine.lock().unit.as_ref()?.full_state()?;
        encode_state(&state)
            .map_err(|err| debug!(%err, "failed to serialise plugin state"))
            .ok()
    }

    fn load_state(&self, blob: &[u8]) {
        if !self.is_ready() {
            return;
        }
        if let Some(unit) = self.shared.engine.lock().unit.as_deref_mut() {
            apply_state(unit, blob);
        }
    }

    fn editor_view(&self) -> Option<ViewHandle> {
        if !self.is_ready() {
            return None;
        }
        self.shared.engine.lock().unit.as_ref()?.view()
    }

    fn supports_async_editor(&self) -> bool {
        true
    }

    fn request_editor_view(&self, timeout: Duration, reply: ViewReply) {
        let guard = OneShotReply::new(reply);
        let control = self.shared.control.clone();

        if !self.is_ready() {
            guard.deliver(&control, None);
            return;
        }

        let (done_tx, done_rx) = bounded::<()>(1);
        let timer_guard = guard.clone();
        let timer_control = control.clone();
        let identifier = self.shared.reference.identifier.clone();
        let timer = thread::Builder::new()
            .name("au-editor-timeout".into())
            .spawn(move || {
                // A unit that drops the reply without answering disconnects
                // the channel; that counts as "no view".
                select! {
                    recv(done_rx) -> answered => {
                        if answered.is_err() && timer_guard.deliver(&timer_control, None) {
                            debug!(%identifier, "custom view request dropped by the unit");
                        }
                    }
                    recv(after(timeout)) -> _ => {
                        if timer_guard.deliver(&timer_control, None) {
                            warn!(%identifier, ?timeout, "custom view request timed out");
                        }
                    }
                }
            });
        if let Err(err) = timer {
            warn!(%err, "failed to start editor timeout timer");
        }

        let on_view: ViewReply = Box::new(move |view| {
            guard.deliver(&control, view);
            let _ = done_tx.send(());
        });
        let mut engine = self.shared.engine.lock();
        match engine.unit.as_mut() {
            Some(unit) => unit.request_view(on_view),
            None => on_view(None),
        }
    }
}
