use std::f32::consts::PI;

use crate::{semitones_to_ratio, PitchShifter, MAX_SEMITONES};

/// Length of the sweep window.
const WINDOW_SECONDS: f64 = 0.05;
const MIN_WINDOW: usize = 4;

/// Two-tap delay-line pitch shifter.
///
/// Each tap reads the delay line at `ratio` times the write speed. When a
/// tap reaches the end of the window it jumps back, and the sin² crossfade
/// hides the jump behind the other tap, which is half a window away.
#[derive(Clone, Debug)]
pub struct DelayLineShifter {
    sample_rate: f64,
    channels: usize,
    window: usize,
    history: Vec<f32>,
    write: usize,
    phase: f32,
    ratio: f32,
    semitones: f64,
}

impl DelayLineShifter {
    pub fn new(sample_rate: f64, channels: usize) -> Self {
        let mut shifter = Self {
            sample_rate: 0.0,
            channels: 0,
            window: 0,
            history: Vec::new(),
            write: 0,
            phase: 0.0,
            ratio: 1.0,
            semitones: 0.0,
        };
        shifter.reconfigure(sample_rate, channels);
        shifter
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sweep window length in frames.
    pub fn window_frames(&self) -> usize {
        self.window
    }

    #[inline]
    fn read(&self, channel: usize, delay: f32) -> f32 {
        let len = self.window as f32;
        let position = (self.write as f32 - delay).rem_euclid(len);
        let index = position.floor() as usize % self.window;
        let next = (index + 1) % self.window;
        let frac = position - position.floor();
        let a = self.history[index * self.channels + channel];
        let b = self.history[next * self.channels + channel];
        a + (b - a) * frac
    }
}

impl PitchShifter for DelayLineShifter {
    fn reconfigure(&mut self, sample_rate: f64, channels: usize) {
        let sample_rate = sample_rate.max(1.0);
        let channels = channels.max(1);
        if self.sample_rate == sample_rate && self.channels == channels {
            return;
        }
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.window = ((sample_rate * WINDOW_SECONDS).round() as usize).max(MIN_WINDOW);
        self.history = vec![0.0; self.window * channels];
        self.reset();
    }

    fn set_pitch_semitones(&mut self, semitones: f64) {
        self.semitones = semitones.clamp(-MAX_SEMITONES, MAX_SEMITONES);
        self.ratio = semitones_to_ratio(self.semitones) as f32;
    }

    fn pitch_semitones(&self) -> f64 {
        self.semitones
    }

    fn process(&mut self, input: &[f32], channels: usize, output: &mut [f32]) -> usize {
        if channels == 0 {
            return 0;
        }
        if channels != self.channels {
            self.reconfigure(self.sample_rate, channels);
        }
        let frames = (input.len() / channels).min(output.len() / channels);
        let span = (self.window - 1) as f32;
        let step = (1.0 - self.ratio) / self.window as f32;
        let bypass = self.ratio == 1.0;

        for frame in 0..frames {
            let base = frame * channels;
            let slot = self.write * channels;
            self.history[slot..slot + channels].copy_from_slice(&input[base..base + channels]);

            if bypass {
                output[base..base + channels].copy_from_slice(&input[base..base + channels]);
            } else {
                let first = self.phase;
                let second = (first + 0.5).fract();
                let gain = (PI * first).sin().powi(2);
                for channel in 0..channels {
                    let a = self.read(channel, first * span);
                    let b = self.read(channel, second * span);
                    output[base + channel] = gain * a + (1.0 - gain) * b;
                }
                self.phase = (self.phase + step).rem_euclid(1.0);
            }

            self.write += 1;
            if self.write >= self.window {
                self.write = 0;
            }
        }
        frames
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
        self.write = 0;
        self.phase = 0.0;
    }
}
