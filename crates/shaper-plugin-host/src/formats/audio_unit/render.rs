//! Render path of the audio-unit backend.
//!
//! Everything here runs on the render thread and never allocates after the
//! first call for a given channel shape.

use tracing::{debug, warn};

use super::native::{BufferList, NativeUnit, OsStatus, PullInput, RenderTimestamp, NO_ERR};
use crate::audio_buffer::AudioBuffer;
use crate::instance::AudioFormat;

/// Ceiling handed to the unit as its maximum frames per render call.
pub const MAX_FRAMES_PER_SLICE: usize = 4096;

/// Result of one negotiation: what the caller asked for and what the unit
/// actually renders at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NegotiatedFormat {
    pub requested: AudioFormat,
    pub render_channels: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderOutcome {
    Rendered,
    Failed(OsStatus),
    Skipped,
}

/// Preallocated buffers for one render channel shape.
struct ScratchList {
    /// Prepared input, one buffer per render channel.
    input: Vec<Vec<f32>>,
    /// Copy of the caller's channels taken before rendering.
    dry: [Vec<f32>; 2],
    /// Second output channel when a stereo render feeds a mono caller.
    spare: Vec<f32>,
}

impl ScratchList {
    fn new(render_channels: usize) -> Self {
        Self {
            input: vec![vec![0.0; MAX_FRAMES_PER_SLICE]; render_channels],
            dry: [
                vec![0.0; MAX_FRAMES_PER_SLICE],
                vec![0.0; MAX_FRAMES_PER_SLICE],
            ],
            spare: if render_channels == 2 {
                vec![0.0; MAX_FRAMES_PER_SLICE]
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Default)]
struct RenderScratch {
    mono: Option<ScratchList>,
    stereo: Option<ScratchList>,
}

impl RenderScratch {
    fn for_channels(&mut self, render_channels: usize) -> &mut ScratchList {
        let slot = if render_channels == 1 {
            &mut self.mono
        } else {
            &mut self.stereo
        };
        slot.get_or_insert_with(|| {
            debug!(render_channels, "allocating render scratch");
            ScratchList::new(render_channels)
        })
    }
}

/// Render-thread state owned alongside the native unit.
#[derive(Default)]
pub(crate) struct RenderState {
    pub negotiated: Option<NegotiatedFormat>,
    sample_time: f64,
    scratch: RenderScratch,
    failing: bool,
}

impl RenderState {
    /// Drops the negotiated format so every `process` call becomes a no-op
    /// until the next successful negotiation.
    pub fn invalidate(&mut self) {
        self.negotiated = None;
    }

    pub fn render(
        &mut self,
        unit: &mut dyn NativeUnit,
        buffer: &mut AudioBuffer,
        frames: usize,
    ) -> RenderOutcome {
        let Some(format) = self.negotiated else {
            return RenderOutcome::Skipped;
        };
        let caller = format.requested.channels as usize;
        let render = format.render_channels as usize;
        if frames == 0
            || frames > MAX_FRAMES_PER_SLICE
            || buffer.frames() < frames
            || buffer.channels() < caller
            || !(1..=2).contains(&caller)
            || !(1..=2).contains(&render)
        {
            return RenderOutcome::Skipped;
        }

        let ScratchList { input, dry, spare } = self.scratch.for_channels(render);

        for (channel, source) in buffer.channel_slices().take(caller).enumerate() {
            dry[channel][..frames].copy_from_slice(&source[..frames]);
        }
        match (render, caller) {
            (1, 2) => {
                let (left, right) = (&dry[0][..frames], &dry[1][..frames]);
                for ((out, l), r) in input[0][..frames].iter_mut().zip(left).zip(right) {
                    *out = 0.5 * (l + r);
                }
            }
            (2, 1) => {
                input[0][..frames].copy_from_slice(&dry[0][..frames]);
                input[1][..frames].copy_from_slice(&dry[0][..frames]);
            }
            _ => {
                for (channel, prepared) in input.iter_mut().enumerate() {
                    prepared[..frames].copy_from_slice(&dry[channel][..frames]);
                }
            }
        }

        let timestamp = RenderTimestamp {
            sample_time: self.sample_time,
        };
        self.sample_time += frames as f64;

        let prepared: &[Vec<f32>] = input;
        // The unit may pull any number of times; every pull sees the same input.
        let pull_input: &mut PullInput<'_> = &mut |_, requested, list| {
            let count = (requested as usize).min(frames);
            for (index, target) in list.as_mut_slices().iter_mut().enumerate() {
                let source = &prepared[index.min(prepared.len() - 1)];
                let count = count.min(target.len());
                target[..count].copy_from_slice(&source[..count]);
            }
            NO_ERR
        };

        let (left, right) = buffer.stereo_mut();
        let Some(left) = left else {
            return RenderOutcome::Skipped;
        };
        let mut right = if caller == 2 { right } else { None };

        let status = match (render, right.as_deref_mut()) {
            (1, _) => {
                let mut outputs = [&mut left[..frames]];
                unit.render(
                    &timestamp,
                    frames as u32,
                    &mut BufferList::new(&mut outputs),
                    pull_input,
                )
            }
            (_, Some(right)) => {
                let mut outputs = [&mut left[..frames], &mut right[..frames]];
                unit.render(
                    &timestamp,
                    frames as u32,
                    &mut BufferList::new(&mut outputs),
                    pull_input,
                )
            }
            (_, None) => {
                let mut outputs = [&mut left[..frames], &mut spare[..frames]];
                unit.render(
                    &timestamp,
                    frames as u32,
                    &mut BufferList::new(&mut outputs),
                    pull_input,
                )
            }
        };

        if status == NO_ERR {
            if let (1, Some(right)) = (render, right) {
                right[..frames].copy_from_slice(&left[..frames]);
            }
            if self.failing {
                debug!("native render recovered");
                self.failing = false;
            }
            return RenderOutcome::Rendered;
        }

        left[..frames].copy_from_slice(&dry[0][..frames]);
        if let Some(right) = right {
            right[..frames].copy_from_slice(&dry[1][..frames]);
        }
        if !self.failing {
            warn!(status, frames, "native render failed, passing dry signal");
            self.failing = true;
        }
        RenderOutcome::Failed(status)
    }
}
