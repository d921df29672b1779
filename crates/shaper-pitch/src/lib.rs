//! Pitch shifting helper for AudioShaper.
//!
//! Consumers only see the narrow synchronous [`PitchShifter`] contract. The
//! bundled [`DelayLineShifter`] implements it with two crossfaded read taps
//! sweeping through a short delay line, which keeps latency and allocation
//! off the audio thread.

mod shifter;

pub use shifter::DelayLineShifter;

/// Largest shift, in either direction, a shifter accepts.
pub const MAX_SEMITONES: f64 = 24.0;

/// Synchronous pitch shifter operating on interleaved frames.
pub trait PitchShifter: Send {
    /// Prepares for `sample_rate`/`channels`. Buffers are only reallocated
    /// when either value changes.
    fn reconfigure(&mut self, sample_rate: f64, channels: usize);

    /// Sets the shift in semitones, clamped to `±MAX_SEMITONES`.
    fn set_pitch_semitones(&mut self, semitones: f64);

    fn pitch_semitones(&self) -> f64;

    /// Shifts `input` into `output`, both interleaved with `channels`
    /// channels. Processes at most as many frames as `output` can hold and
    /// returns the number of frames written.
    fn process(&mut self, input: &[f32], channels: usize, output: &mut [f32]) -> usize;

    /// Clears all internal history.
    fn reset(&mut self);
}

/// Playback-rate ratio for a shift in semitones.
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    (semitones / 12.0).exp2()
}
