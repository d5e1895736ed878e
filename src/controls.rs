// src/controls.rs

//! The control surface: gain, reverb mix and one gate per key.
//!
//! Values live in atomics so the UI/automation side can write them from any
//! thread while the audio thread reads one snapshot per block.

use crate::keys::KeyId;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const GAIN_DB_MIN: f32 = -48.0;
pub const GAIN_DB_MAX: f32 = 6.0;
/// Gains below this are treated as silence and shown as "-inf".
pub const GAIN_DB_AUDIBLE_LIMIT: f32 = -47.9;
pub const GAIN_DB_DEFAULT: f32 = 0.0;

pub const REVERB_MIX_MAX: u32 = 100;

// dB values are stored as `(value_db + DB_OFFSET) * DB_SCALER` so the atomic stays positive.
const DB_SCALER: f32 = 100_000.0;
const DB_OFFSET: f32 = -GAIN_DB_MIN;

fn encode_db(db: f32) -> u32 {
    ((db.clamp(GAIN_DB_MIN, GAIN_DB_MAX) + DB_OFFSET) * DB_SCALER).round() as u32
}

fn decode_db(raw: u32) -> f32 {
    raw as f32 / DB_SCALER - DB_OFFSET
}

/// Host-facing identifier of a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    Gain,
    Reverb,
    Key(KeyId),
}

impl ControlId {
    pub fn all() -> impl Iterator<Item = ControlId> {
        [ControlId::Gain, ControlId::Reverb]
            .into_iter()
            .chain(KeyId::ALL.into_iter().map(ControlId::Key))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlId::Gain => "gain",
            ControlId::Reverb => "reverb",
            ControlId::Key(key) => key.control_id(),
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control: {0}")]
pub struct UnknownControl(pub String);

impl FromStr for ControlId {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gain" => Ok(ControlId::Gain),
            "reverb" => Ok(ControlId::Reverb),
            other => other
                .strip_prefix("key-")
                .and_then(|name| name.parse::<KeyId>().ok())
                .map(ControlId::Key)
                .ok_or_else(|| UnknownControl(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlValue {
    Float(f32),
    Int(u32),
    Bool(bool),
}

impl ControlValue {
    fn as_f32(self) -> f32 {
        match self {
            ControlValue::Float(v) => v,
            ControlValue::Int(v) => v as f32,
            ControlValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Everything the engine needs from the controls for one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlSnapshot {
    pub gain_db: f32,
    pub reverb_mix: u32,
    pub gates: [bool; KeyId::COUNT],
}

impl ControlSnapshot {
    #[inline]
    pub fn gate(&self, key: KeyId) -> bool {
        self.gates[key.index()]
    }

    /// Reverb mix as a 0.0..=1.0 wet level.
    #[inline]
    pub fn wet_level(&self) -> f32 {
        self.reverb_mix as f32 / REVERB_MIX_MAX as f32
    }
}

#[derive(Debug)]
pub struct Controls {
    gain_db: AtomicU32,
    reverb_mix: AtomicU32,
    gates: [AtomicBool; KeyId::COUNT],
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            gain_db: AtomicU32::new(encode_db(GAIN_DB_DEFAULT)),
            reverb_mix: AtomicU32::new(0),
            gates: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gain_db(&self) -> f32 {
        decode_db(self.gain_db.load(Ordering::Relaxed))
    }

    /// Sets the gain, clamped to `GAIN_DB_MIN..=GAIN_DB_MAX`.
    pub fn set_gain_db(&self, db: f32) {
        if db.is_nan() {
            return;
        }
        self.gain_db.store(encode_db(db), Ordering::Relaxed);
    }

    pub fn reverb_mix(&self) -> u32 {
        self.reverb_mix.load(Ordering::Relaxed)
    }

    /// Sets the reverb mix percentage, clamped to 0..=100.
    pub fn set_reverb_mix(&self, percent: u32) {
        self.reverb_mix
            .store(percent.min(REVERB_MIX_MAX), Ordering::Relaxed);
    }

    pub fn gate(&self, key: KeyId) -> bool {
        self.gates[key.index()].load(Ordering::Relaxed)
    }

    pub fn set_gate(&self, key: KeyId, on: bool) {
        self.gates[key.index()].store(on, Ordering::Relaxed);
    }

    /// Flips a gate and returns its new value.
    pub fn toggle_gate(&self, key: KeyId) -> bool {
        !self.gates[key.index()].fetch_xor(true, Ordering::Relaxed)
    }

    pub fn value(&self, id: ControlId) -> ControlValue {
        match id {
            ControlId::Gain => ControlValue::Float(self.gain_db()),
            ControlId::Reverb => ControlValue::Int(self.reverb_mix()),
            ControlId::Key(key) => ControlValue::Bool(self.gate(key)),
        }
    }

    /// Writes a control, converting the value to the control's own kind.
    pub fn set_value(&self, id: ControlId, value: ControlValue) {
        match id {
            ControlId::Gain => self.set_gain_db(value.as_f32()),
            ControlId::Reverb => {
                let percent = value.as_f32().round().max(0.0) as u32;
                self.set_reverb_mix(percent);
            }
            ControlId::Key(key) => {
                let on = match value {
                    ControlValue::Bool(v) => v,
                    other => other.as_f32() >= 0.5,
                };
                self.set_gate(key, on);
            }
        }
    }

    /// Text shown for a control's current value by a generic parameter editor.
    pub fn display_value(&self, id: ControlId) -> String {
        match self.value(id) {
            ControlValue::Float(db) => format_gain_db(db),
            ControlValue::Int(percent) => format!("{percent} %"),
            ControlValue::Bool(on) => (if on { "on" } else { "off" }).to_string(),
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            gain_db: self.gain_db(),
            reverb_mix: self.reverb_mix(),
            gates: std::array::from_fn(|i| self.gates[i].load(Ordering::Relaxed)),
        }
    }
}

pub fn format_gain_db(db: f32) -> String {
    if db < GAIN_DB_AUDIBLE_LIMIT {
        "-inf".to_string()
    } else {
        format!("{db:.1}")
    }
}
