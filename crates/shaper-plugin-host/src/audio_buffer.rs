use std::ops::{Index, IndexMut};

/// Channel-major audio buffer exchanged with the render collaborator.
///
/// Each channel owns its own contiguous sample storage. Hosted units render
/// straight into these slices, so the buffer is never reallocated on the
/// render path.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBuffer {
    /// Creates a buffer with the provided number of channels and frames,
    /// initialised to silence.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channels],
            frames,
        }
    }

    /// Wraps existing channel data. Every channel is truncated to the length
    /// of the shortest one.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self { channels, frames }
    }

    /// Returns the number of channels stored in the buffer.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of sample frames in the buffer.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns an iterator over channel slices.
    pub fn channel_slices(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(|channel| channel.as_slice())
    }

    /// Borrows the first one or two channels mutably at the same time.
    pub fn stereo_mut(&mut self) -> (Option<&mut [f32]>, Option<&mut [f32]>) {
        let mut iter = self.channels.iter_mut();
        let left = iter.next().map(|channel| channel.as_mut_slice());
        let right = iter.next().map(|channel| channel.as_mut_slice());
        (left, right)
    }
}

impl Index<usize> for AudioBuffer {
    type Output = [f32];

    fn index(&self, index: usize) -> &Self::Output {
        self.channels[index].as_slice()
    }
}

impl IndexMut<usize> for AudioBuffer {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.channels[index].as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_channels_truncates_to_shortest() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0; 8], vec![2.0; 6]]);
        assert_eq!(buffer.frames(), 6);
        assert_eq!(buffer[0].len(), 6);
    }

    #[test]
    fn stereo_mut_borrows_both_channels() {
        let mut buffer = AudioBuffer::new(2, 4);
        let (left, right) = buffer.stereo_mut();
        left.unwrap().fill(1.0);
        right.unwrap().fill(-1.0);
        assert_eq!(&buffer[0], &[1.0; 4]);
        assert_eq!(&buffer[1], &[-1.0; 4]);
    }
}
