// src/audio_engine.rs

pub mod command;
pub mod helpers;
pub mod key_trigger;
pub mod post_processor;

use crate::audio_buffer::AudioBuffer;
use crate::controls::Controls;
use crate::keys::KeyId;
use crate::sample_store::{SampleError, SampleStore};
use crate::sampler_engine::{SamplerEngine, DEFAULT_SAMPLE_RATE};
use crate::settings::EngineSettings;
use crate::synth::Engine;
use key_trigger::KeyTrigger;
use post_processor::PostProcessor;
use std::sync::Arc;
use tracing::{debug, info};

/// Block-based audio callback interface.
///
/// `prepare` is called before the first block and whenever the stream
/// parameters change; it may allocate. `process_block` runs on the audio
/// thread and mixes into the buffer it is given without resizing it.
pub trait AudioProcessor {
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);
    fn process_block(&mut self, buffer: &mut AudioBuffer);
    fn release(&mut self);
}

struct KeyInstrument {
    trigger: KeyTrigger,
    sampler: SamplerEngine,
}

/// Seven sample instruments, one per key, summed into the output and passed
/// through the reverb and the output gain.
pub struct AudioEngine {
    controls: Arc<Controls>,
    instruments: [KeyInstrument; KeyId::COUNT],
    post: PostProcessor,
    input_channels: usize,
    sample_rate: f32,
}

impl AudioEngine {
    /// Fails with `NotFound` for the first key without a sample.
    pub fn new(
        store: &SampleStore,
        controls: Arc<Controls>,
        settings: &EngineSettings,
    ) -> Result<Self, SampleError> {
        if let Some(key) = store.missing_keys().next() {
            return Err(SampleError::NotFound(key));
        }

        let sample_rate = DEFAULT_SAMPLE_RATE;
        let instruments = std::array::from_fn(|i| KeyInstrument {
            trigger: KeyTrigger::new(),
            sampler: SamplerEngine::new(
                Arc::clone(store.get(KeyId::ALL[i])),
                settings.voices_per_key,
                settings.envelope,
                sample_rate,
            ),
        });

        Ok(Self {
            controls,
            instruments,
            post: PostProcessor::new(sample_rate, settings.reverb.to_params()),
            input_channels: settings.input_channels,
            sample_rate,
        })
    }

    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn is_playing(&self, key: KeyId) -> bool {
        self.instruments[key.index()].trigger.is_playing()
    }

    pub fn active_voice_count(&self, key: KeyId) -> usize {
        self.instruments[key.index()].sampler.active_voice_count()
    }

    /// Gain the output ended on in the last block.
    pub fn last_applied_gain(&self) -> f32 {
        self.post.last_applied_gain()
    }

    fn silence(&mut self) {
        for instrument in &mut self.instruments {
            instrument.sampler.all_notes_off(false);
            instrument.trigger.reset();
        }
    }
}

impl AudioProcessor for AudioEngine {
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        info!(sample_rate, max_block_size, "Preparing audio engine");
        self.sample_rate = sample_rate;
        for instrument in &mut self.instruments {
            instrument.sampler.set_sample_rate(sample_rate);
        }
        self.silence();
        self.post.prepare(sample_rate, max_block_size);
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let snapshot = self.controls.snapshot();

        for ch in self.input_channels..buffer.num_channels() {
            buffer.clear_channel(ch);
        }

        let num_frames = buffer.num_frames();
        for key in KeyId::ALL {
            let instrument = &mut self.instruments[key.index()];
            instrument
                .trigger
                .update(snapshot.gate(key), &mut instrument.sampler);
            instrument.sampler.render_block(buffer, 0, num_frames);
        }

        self.post.process(buffer, &snapshot);
    }

    fn release(&mut self) {
        debug!("Releasing audio engine");
        self.silence();
        self.post.reset();
    }
}
