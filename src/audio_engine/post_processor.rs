// src/audio_engine/post_processor.rs

use crate::audio_buffer::AudioBuffer;
use crate::controls::{ControlSnapshot, GAIN_DB_AUDIBLE_LIMIT};
use crate::fx_components::{decibels_to_gain, DspComponent, Gain, Reverb, ReverbParams};

/// Reverb followed by the ramped output gain. The order is fixed: the reverb
/// sees the dry mix, the gain scales the reverberated result.
pub struct PostProcessor {
    reverb: Reverb,
    reverb_params: ReverbParams,
    gain: Gain,
}

impl PostProcessor {
    /// `reverb_params` supplies room size, damping and width; wet and dry
    /// levels come from the controls every block.
    pub fn new(sample_rate: f32, reverb_params: ReverbParams) -> Self {
        Self {
            reverb: Reverb::new(sample_rate, reverb_params.with_mix(0.0)),
            reverb_params,
            gain: Gain::new(),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.reverb.prepare(sample_rate, max_block_size);
        self.gain.prepare(sample_rate, max_block_size);
    }

    pub fn reset(&mut self) {
        self.reverb.reset();
        self.gain.reset();
    }

    /// Gain applied at the end of the last block.
    pub fn last_applied_gain(&self) -> f32 {
        self.gain.last_gain()
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer, controls: &ControlSnapshot) {
        self.reverb
            .set_params(self.reverb_params.with_mix(controls.wet_level()));
        self.reverb.process(buffer);

        self.gain
            .set_target_gain(decibels_to_gain(controls.gain_db, GAIN_DB_AUDIBLE_LIMIT));
        self.gain.process(buffer);
    }
}
