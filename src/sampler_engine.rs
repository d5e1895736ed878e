// src/sampler_engine.rs

use crate::audio_buffer::AudioBuffer;
use crate::sample_store::SampleAsset;
use crate::synth::{Engine, Envelope, EnvelopeSettings, EnvelopeStage};
use std::sync::Arc;

/// Voices per key instrument.
pub const NUM_VOICES: usize = 10;

/// Output rate assumed until the host prepares the engine.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

// --- Voice ---

struct Voice {
    note: u8,
    position: f64,
    pitch_ratio: f64,
    gain: f32,
    envelope: Envelope,
    started_at: u64, // note-on stamp; the lowest stamp is the oldest voice
}

impl Voice {
    fn new(envelope: EnvelopeSettings, sample_rate: f32) -> Self {
        Self {
            note: 0,
            position: 0.0,
            pitch_ratio: 1.0,
            gain: 0.0,
            envelope: Envelope::new(envelope, sample_rate),
            started_at: 0,
        }
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    /// Held voices are the ones a note-off for their pitch still applies to.
    #[inline]
    fn is_key_down(&self) -> bool {
        matches!(
            self.envelope.stage(),
            EnvelopeStage::Attack | EnvelopeStage::Sustain
        )
    }

    fn start(&mut self, note: u8, velocity: f32, pitch_ratio: f64, stamp: u64) {
        self.note = note;
        self.position = 0.0;
        self.pitch_ratio = pitch_ratio;
        self.gain = velocity;
        self.started_at = stamp;
        self.envelope.note_on();
    }

    fn stop(&mut self, allow_tail_off: bool) {
        if allow_tail_off {
            self.envelope.note_off();
        } else {
            self.envelope.reset();
        }
    }

    fn render(&mut self, asset: &SampleAsset, buffer: &mut AudioBuffer, start: usize, count: usize) {
        let frames = asset.num_frames();
        let in_channels = asset.num_channels();
        let out_channels = buffer.num_channels();
        if frames == 0 || in_channels == 0 {
            self.envelope.reset();
            return;
        }

        for frame in start..start + count {
            if self.position >= frames as f64 {
                self.envelope.reset();
                break;
            }

            let amp = self.envelope.next_value() * self.gain;

            if out_channels == 1 && in_channels > 1 {
                let mixed = (interpolated(asset.channel(0), self.position)
                    + interpolated(asset.channel(1), self.position))
                    * 0.5;
                buffer.channel_mut(0)[frame] += mixed * amp;
            } else {
                for ch in 0..out_channels {
                    let value = interpolated(asset.channel(ch % in_channels), self.position);
                    buffer.channel_mut(ch)[frame] += value * amp;
                }
            }

            if !self.envelope.is_active() {
                break;
            }

            self.position += self.pitch_ratio;
        }

        if self.position >= frames as f64 {
            self.envelope.reset();
        }
    }
}

/// Linear interpolation between the two frames around `position`. Reads past
/// the end of the data are silent.
#[inline]
fn interpolated(data: &[f32], position: f64) -> f32 {
    let index = position as usize;
    let frac = (position - index as f64) as f32;
    let a = data.get(index).copied().unwrap_or(0.0);
    if frac == 0.0 {
        return a;
    }
    let b = data.get(index + 1).copied().unwrap_or(0.0);
    a + (b - a) * frac
}

// --- Voice pool ---

/// A fixed pool of voices playing one sample.
///
/// When every voice is busy a new note steals the voice with the oldest
/// note-on, whatever stage it is in. Ties cannot happen: every note-on gets a
/// fresh stamp.
pub struct SamplerEngine {
    asset: Arc<SampleAsset>,
    voices: Vec<Voice>,
    sample_rate: f32,
    next_stamp: u64,
}

impl SamplerEngine {
    pub fn new(
        asset: Arc<SampleAsset>,
        num_voices: usize,
        envelope: EnvelopeSettings,
        sample_rate: f32,
    ) -> Self {
        let voices = (0..num_voices.max(1))
            .map(|_| Voice::new(envelope, sample_rate))
            .collect();
        Self {
            asset,
            voices,
            sample_rate,
            next_stamp: 0,
        }
    }

    /// Changes the output rate. Voices already sounding keep their old pitch
    /// ratio; callers normally silence the pool first.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.envelope.set_sample_rate(sample_rate);
        }
    }

    /// Playback-rate multiplier for `note`, folding in the difference between
    /// the sample's recorded rate and the output rate.
    pub fn pitch_ratio(&self, note: u8) -> f64 {
        let semitones = note as f64 - self.asset.root_note() as f64;
        let pitch = 2.0_f64.powf(semitones / 12.0);
        if self.sample_rate <= 0.0 {
            return pitch;
        }
        pitch * self.asset.sample_rate() as f64 / self.sample_rate as f64
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// True while some voice is still sounding `note`, including its release tail.
    pub fn is_note_active(&self, note: u8) -> bool {
        self.voices.iter().any(|v| v.is_active() && v.note == note)
    }

    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.stop(allow_tail_off);
        }
    }

    fn allocate_voice(&mut self) -> &mut Voice {
        let index = self
            .voices
            .iter()
            .position(|v| !v.is_active())
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.started_at)
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);
        &mut self.voices[index]
    }
}

impl Engine for SamplerEngine {
    fn note_on(&mut self, note: u8, velocity: f32) {
        let pitch_ratio = self.pitch_ratio(note.min(127));
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let velocity = velocity.clamp(0.0, 1.0);
        self.allocate_voice()
            .start(note, velocity, pitch_ratio, stamp);
    }

    fn note_off(&mut self, note: u8, _velocity: f32, allow_tail_off: bool) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.note == note && v.is_key_down())
        {
            voice.stop(allow_tail_off);
        }
    }

    fn render_block(&mut self, buffer: &mut AudioBuffer, start_frame: usize, num_frames: usize) {
        let end = start_frame.saturating_add(num_frames).min(buffer.num_frames());
        if start_frame >= end {
            return;
        }
        let asset = &self.asset;
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.render(asset, buffer, start_frame, end - start_frame);
        }
    }
}
