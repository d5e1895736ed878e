// src/keys.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven playable keys. Each key owns one sample, one voice pool
/// and one gate control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyId {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl KeyId {
    pub const COUNT: usize = 7;

    pub const ALL: [KeyId; KeyId::COUNT] = [
        KeyId::C,
        KeyId::D,
        KeyId::E,
        KeyId::F,
        KeyId::G,
        KeyId::A,
        KeyId::B,
    ];

    /// Position of this key in `ALL`, used to index per-key arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyId::C => "C",
            KeyId::D => "D",
            KeyId::E => "E",
            KeyId::F => "F",
            KeyId::G => "G",
            KeyId::A => "A",
            KeyId::B => "B",
        }
    }

    /// The host-facing identifier of this key's gate control.
    pub fn control_id(self) -> &'static str {
        match self {
            KeyId::C => "key-c",
            KeyId::D => "key-d",
            KeyId::E => "key-e",
            KeyId::F => "key-f",
            KeyId::G => "key-g",
            KeyId::A => "key-a",
            KeyId::B => "key-b",
        }
    }

    /// File name the directory loader expects for this key's sample.
    pub fn sample_file_name(self) -> String {
        format!("{}.wav", self.name())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for KeyId {
    type Err = UnknownKey;

    /// Accepts the bare note name (`c`, `C`) or the control id (`key-c`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix("key-").unwrap_or(trimmed);
        KeyId::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}
