// src/lib.rs

//! A seven-key sample instrument: one sampler per key, gated on and off,
//! summed and passed through a reverb and a ramped output gain.

pub mod audio_buffer;
pub mod audio_device;
pub mod audio_engine;
pub mod audio_io;
pub mod controls;
pub mod fx_components;
pub mod keys;
pub mod render;
pub mod sample_store;
pub mod sampler_engine;
pub mod settings;
pub mod synth;
#[cfg(test)]
mod test_util;

pub use audio_buffer::AudioBuffer;
pub use audio_engine::{AudioEngine, AudioProcessor};
pub use controls::{ControlId, ControlValue, Controls};
pub use keys::KeyId;
pub use sample_store::{SampleAsset, SampleError, SampleStore};
pub use settings::EngineSettings;
