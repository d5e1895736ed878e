// src/fx_components/mod.rs

pub mod gain;
pub mod reverb;

pub use gain::{decibels_to_gain, Gain};
pub use reverb::{Params as ReverbParams, Reverb};

use crate::audio_buffer::AudioBuffer;

/// A block processor in the post-processing chain.
///
/// `prepare` may allocate and is only called off the audio thread. `process`
/// runs on the audio thread and must not allocate, lock or block.
pub trait DspComponent: Send {
    /// Sizes internal state for a new sample rate and clears it.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Clears internal state without reallocating.
    fn reset(&mut self);

    fn process(&mut self, buffer: &mut AudioBuffer);
}
