// src/audio_buffer.rs

/// A planar multi-channel block of audio.
///
/// Storage is allocated once for `capacity` frames per channel. The number of
/// frames in use can shrink and grow within that capacity without touching the
/// allocator, which is what the audio callback relies on.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    data: Vec<f32>, // channel-major: ch0[0..capacity], ch1[0..capacity], ...
    channels: usize,
    capacity: usize,
    frames: usize,
}

impl AudioBuffer {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels * capacity],
            channels,
            capacity,
            frames: capacity,
        }
    }

    /// Builds a buffer holding a copy of the given channels. All channels must
    /// be the same length.
    pub fn from_channels(channels: &[&[f32]]) -> Self {
        let frames = channels.first().map_or(0, |c| c.len());
        let mut buffer = Self::new(channels.len(), frames);
        for (ch, samples) in channels.iter().enumerate() {
            debug_assert_eq!(samples.len(), frames);
            buffer.channel_mut(ch).copy_from_slice(&samples[..frames]);
        }
        buffer
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sets the number of frames in use, clamped to the capacity. Returns the
    /// frame count actually applied.
    pub fn set_num_frames(&mut self, frames: usize) -> usize {
        self.frames = frames.min(self.capacity);
        self.frames
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.capacity;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.capacity;
        &mut self.data[start..start + self.frames]
    }

    /// Both halves of a stereo pair, or `None` for a mono buffer.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        if self.channels < 2 {
            return None;
        }
        let frames = self.frames;
        let (left, rest) = self.data.split_at_mut(self.capacity);
        Some((&mut left[..frames], &mut rest[..frames]))
    }

    /// Reads one sample; out-of-range positions read as silence.
    #[inline]
    pub fn sample(&self, ch: usize, frame: usize) -> f32 {
        if ch >= self.channels || frame >= self.frames {
            return 0.0;
        }
        self.data[ch * self.capacity + frame]
    }

    pub fn clear(&mut self) {
        for ch in 0..self.channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    pub fn clear_channel(&mut self, ch: usize) {
        if ch < self.channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    /// Copies interleaved input into the buffer. The frame count becomes the
    /// number of whole input frames that fit; channels the input does not
    /// carry are zeroed.
    pub fn copy_from_interleaved(&mut self, input: &[f32], input_channels: usize) -> usize {
        if input_channels == 0 {
            self.set_num_frames(0);
            return 0;
        }
        let frames = self.set_num_frames(input.len() / input_channels);
        for ch in 0..self.channels {
            let start = ch * self.capacity;
            let dest = &mut self.data[start..start + frames];
            if ch < input_channels {
                for (i, d) in dest.iter_mut().enumerate() {
                    *d = input[i * input_channels + ch];
                }
            } else {
                dest.fill(0.0);
            }
        }
        frames
    }

    /// Writes the buffer as interleaved frames of `output_channels` channels.
    /// Output channels past the buffer's last channel repeat that channel, so a
    /// mono buffer feeds both sides of a stereo device.
    pub fn write_interleaved(&self, output: &mut [f32], output_channels: usize) -> usize {
        self.write_interleaved_with(output, output_channels, |s| s)
    }

    /// Like `write_interleaved`, converting each sample on the way out.
    pub fn write_interleaved_with<T>(
        &self,
        output: &mut [T],
        output_channels: usize,
        mut convert: impl FnMut(f32) -> T,
    ) -> usize {
        if output_channels == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.frames.min(output.len() / output_channels);
        for (i, frame) in output.chunks_exact_mut(output_channels).take(frames).enumerate() {
            for (c, s) in frame.iter_mut().enumerate() {
                *s = convert(self.sample(c.min(self.channels - 1), i));
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_num_frames_is_clamped_to_capacity() {
        let mut buffer = AudioBuffer::new(2, 64);
        assert_eq!(buffer.set_num_frames(32), 32);
        assert_eq!(buffer.channel(1).len(), 32);
        assert_eq!(buffer.set_num_frames(100), 64);
        assert_eq!(buffer.num_frames(), 64);
    }

    #[test]
    fn stereo_halves_are_independent() {
        let mut buffer = AudioBuffer::new(2, 4);
        {
            let (l, r) = buffer.stereo_mut().unwrap();
            l.fill(1.0);
            r.fill(-1.0);
        }
        assert_eq!(buffer.channel(0), &[1.0; 4]);
        assert_eq!(buffer.channel(1), &[-1.0; 4]);
        assert!(AudioBuffer::new(1, 4).stereo_mut().is_none());
    }

    #[test]
    fn interleave_round_trip_with_channel_fan_out() {
        let mut buffer = AudioBuffer::new(2, 8);
        let input = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        assert_eq!(buffer.copy_from_interleaved(&input, 2), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.3, 0.5]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4, 0.6]);

        let mono = AudioBuffer::from_channels(&[&[1.0, 2.0]]);
        let mut out = [0.0; 4];
        assert_eq!(mono.write_interleaved(&mut out, 2), 2);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn converted_output_fans_stereo_out_to_wider_frames() {
        let stereo = AudioBuffer::from_channels(&[&[0.5, -0.5], &[0.25, 1.0]]);
        let mut out = [0_i16; 8];
        let written = stereo.write_interleaved_with(&mut out, 4, |s| (s * 100.0) as i16);
        assert_eq!(written, 2);
        assert_eq!(out, [50, 25, 25, 25, -50, 100, 100, 100]);

        // Short output only takes whole frames.
        let mut short = [0.0_f32; 3];
        assert_eq!(stereo.write_interleaved(&mut short, 2), 1);
        assert_eq!(short, [0.5, 0.25, 0.0]);
    }

    #[test]
    fn out_of_range_reads_are_silent() {
        let buffer = AudioBuffer::from_channels(&[&[1.0]]);
        assert_eq!(buffer.sample(0, 0), 1.0);
        assert_eq!(buffer.sample(0, 1), 0.0);
        assert_eq!(buffer.sample(3, 0), 0.0);
    }
}
