// src/synth.rs

use crate::audio_buffer::AudioBuffer;
use serde::{Deserialize, Serialize};

/// Note-driven sound source. Key triggers talk to instruments only through this trait.
pub trait Engine {
    fn note_on(&mut self, note: u8, velocity: f32);
    fn note_off(&mut self, note: u8, velocity: f32, allow_tail_off: bool);
    /// Adds `num_frames` frames of output into `buffer`, starting at `start_frame`.
    fn render_block(&mut self, buffer: &mut AudioBuffer, start_frame: usize, num_frames: usize);
}

/// Attack/release times in seconds. There is no decay stage and the sustain
/// level is always full scale.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EnvelopeSettings {
    pub attack: f32,
    pub release: f32,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack: 0.05,
            release: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Sustain,
    Release,
}

/// Linear attack/release envelope, advanced once per output frame.
#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    settings: EnvelopeSettings,
    stage: EnvelopeStage,
    level: f32,
    attack_rate: f32,
    release_rate: f32,
    sample_rate: f32,
}

impl Envelope {
    pub fn new(settings: EnvelopeSettings, sample_rate: f32) -> Self {
        let mut envelope = Self {
            settings,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            attack_rate: 1.0,
            release_rate: 0.0,
            sample_rate,
        };
        envelope.recalculate_rates();
        envelope
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_rates();
    }

    fn recalculate_rates(&mut self) {
        self.attack_rate = if self.settings.attack > 0.0 && self.sample_rate > 0.0 {
            1.0 / (self.settings.attack * self.sample_rate)
        } else {
            1.0
        };
    }

    #[inline]
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn note_on(&mut self) {
        if self.attack_rate >= 1.0 {
            self.level = 1.0;
            self.stage = EnvelopeStage::Sustain;
        } else {
            self.level = 0.0;
            self.stage = EnvelopeStage::Attack;
        }
    }

    /// Starts the release ramp from wherever the level currently is, so a note
    /// released mid-attack falls back to zero no faster than a full one.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        if self.settings.release > 0.0 && self.sample_rate > 0.0 {
            self.release_rate = self.level / (self.settings.release * self.sample_rate);
            self.stage = EnvelopeStage::Release;
        } else {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }

    pub fn next_value(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => 0.0,
            EnvelopeStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Sustain;
                }
                self.level
            }
            EnvelopeStage::Sustain => self.level,
            EnvelopeStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.reset();
                }
                self.level
            }
        }
    }
}
