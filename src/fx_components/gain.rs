// src/fx_components/gain.rs

//! Output gain with a per-block linear ramp.
//!
//! A new gain never lands as a step: each block ramps from the gain the
//! previous block ended on to the new target, which keeps automation and knob
//! moves free of zipper noise and clicks.

use crate::audio_buffer::AudioBuffer;
use crate::fx_components::DspComponent;

/// Converts decibels to a linear factor. Anything below `minus_infinity_db`
/// is silence.
#[inline]
pub fn decibels_to_gain(db: f32, minus_infinity_db: f32) -> f32 {
    if db < minus_infinity_db {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Multiplies `samples` by a gain moving linearly from `start_gain` on the
/// first sample to `end_gain` on the last.
pub fn apply_gain_ramp(samples: &mut [f32], start_gain: f32, end_gain: f32) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    if start_gain == end_gain {
        if start_gain != 1.0 {
            samples.iter_mut().for_each(|s| *s *= start_gain);
        }
        return;
    }
    if n == 1 {
        samples[0] *= end_gain;
        return;
    }
    let last = (n - 1) as f32;
    for (i, s) in samples.iter_mut().enumerate() {
        let t = i as f32 / last;
        *s *= start_gain * (1.0 - t) + end_gain * t;
    }
}

#[derive(Debug, Clone)]
pub struct Gain {
    last_gain: f32,
    target_gain: f32,
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Gain {
    /// Starts silent so the first block after a reset fades in.
    pub fn new() -> Self {
        Self {
            last_gain: 0.0,
            target_gain: 0.0,
        }
    }

    pub fn set_target_gain(&mut self, gain: f32) {
        self.target_gain = gain;
    }

    /// Gain the last processed block ended on.
    pub fn last_gain(&self) -> f32 {
        self.last_gain
    }
}

impl DspComponent for Gain {
    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {
        self.reset();
    }

    fn reset(&mut self) {
        self.last_gain = 0.0;
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        for ch in 0..buffer.num_channels() {
            apply_gain_ramp(buffer.channel_mut(ch), self.last_gain, self.target_gain);
        }
        self.last_gain = self.target_gain;
    }
}
