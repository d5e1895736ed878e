// FILE: src\audio_engine\command.rs
// ==================================

use crate::controls::{ControlId, ControlValue, Controls};
use crate::keys::KeyId;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid value {value:?} for {control}")]
    InvalidValue {
        control: &'static str,
        value: String,
    },
}

/// A change requested from the control thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    ToggleGate(KeyId),
    SetGate(KeyId, bool),
    SetGain(f32),
    SetReverb(u32),
    Status,
    Quit,
}

impl ControlCommand {
    /// Writes the command into `controls`. `Status` and `Quit` are left to
    /// the caller.
    pub fn apply(self, controls: &Controls) {
        match self {
            ControlCommand::ToggleGate(key) => {
                controls.toggle_gate(key);
            }
            ControlCommand::SetGate(key, on) => controls.set_gate(key, on),
            ControlCommand::SetGain(db) => {
                controls.set_value(ControlId::Gain, ControlValue::Float(db))
            }
            ControlCommand::SetReverb(mix) => {
                controls.set_value(ControlId::Reverb, ControlValue::Int(mix))
            }
            ControlCommand::Status | ControlCommand::Quit => {}
        }
    }
}

fn split_value(s: &str) -> (&str, Option<&str>) {
    match s.split_once(|c: char| c == '=' || c.is_whitespace()) {
        Some((name, value)) => (name.trim(), Some(value.trim()).filter(|v| !v.is_empty())),
        None => (s, None),
    }
}

/// Parses `c` (toggle), `c+` / `c-` (gate on/off), `gain -6`, `gain=-6`,
/// `reverb 30`, `status` and `quit`.
impl FromStr for ControlCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CommandError::Empty);
        }
        let (name, value) = split_value(s);
        match name.to_ascii_lowercase().as_str() {
            "gain" => {
                let value = value.ok_or(CommandError::MissingValue("gain"))?;
                let db = if value.eq_ignore_ascii_case("-inf") {
                    f32::NEG_INFINITY
                } else {
                    value.parse::<f32>().map_err(|_| CommandError::InvalidValue {
                        control: "gain",
                        value: value.to_string(),
                    })?
                };
                Ok(ControlCommand::SetGain(db))
            }
            "reverb" => {
                let value = value.ok_or(CommandError::MissingValue("reverb"))?;
                let mix = value
                    .trim_end_matches('%')
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| CommandError::InvalidValue {
                        control: "reverb",
                        value: value.to_string(),
                    })?;
                Ok(ControlCommand::SetReverb(mix))
            }
            "status" | "s" => Ok(ControlCommand::Status),
            "quit" | "q" | "exit" => Ok(ControlCommand::Quit),
            _ => {
                let (key_name, gate) = if let Some(k) = s.strip_suffix('+') {
                    (k, Some(true))
                } else if let Some(k) = s.strip_suffix('-') {
                    (k, Some(false))
                } else {
                    (s, None)
                };
                let key = key_name
                    .parse::<KeyId>()
                    .map_err(|_| CommandError::Unknown(s.to_string()))?;
                Ok(match gate {
                    Some(on) => ControlCommand::SetGate(key, on),
                    None => ControlCommand::ToggleGate(key),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::GAIN_DB_MIN;

    #[test]
    fn parses_key_commands() {
        assert_eq!("c".parse::<ControlCommand>(), Ok(ControlCommand::ToggleGate(KeyId::C)));
        assert_eq!(" G ".parse::<ControlCommand>(), Ok(ControlCommand::ToggleGate(KeyId::G)));
        assert_eq!("key-a+".parse::<ControlCommand>(), Ok(ControlCommand::SetGate(KeyId::A, true)));
        assert_eq!("b-".parse::<ControlCommand>(), Ok(ControlCommand::SetGate(KeyId::B, false)));
        assert_eq!(
            "h".parse::<ControlCommand>(),
            Err(CommandError::Unknown("h".to_string()))
        );
    }

    #[test]
    fn parses_value_commands() {
        assert_eq!("gain -6".parse::<ControlCommand>(), Ok(ControlCommand::SetGain(-6.0)));
        assert_eq!("gain=1.5".parse::<ControlCommand>(), Ok(ControlCommand::SetGain(1.5)));
        assert_eq!("reverb 30".parse::<ControlCommand>(), Ok(ControlCommand::SetReverb(30)));
        assert_eq!("reverb=45%".parse::<ControlCommand>(), Ok(ControlCommand::SetReverb(45)));
        assert_eq!(
            "gain".parse::<ControlCommand>(),
            Err(CommandError::MissingValue("gain"))
        );
        assert!(matches!(
            "reverb loud".parse::<ControlCommand>(),
            Err(CommandError::InvalidValue { control: "reverb", .. })
        ));
        assert_eq!("q".parse::<ControlCommand>(), Ok(ControlCommand::Quit));
        assert_eq!("".parse::<ControlCommand>(), Err(CommandError::Empty));
    }

    #[test]
    fn apply_updates_controls() {
        let controls = Controls::new();
        ControlCommand::ToggleGate(KeyId::D).apply(&controls);
        assert!(controls.gate(KeyId::D));
        ControlCommand::ToggleGate(KeyId::D).apply(&controls);
        assert!(!controls.gate(KeyId::D));
        ControlCommand::SetGate(KeyId::F, true).apply(&controls);
        assert!(controls.gate(KeyId::F));

        ControlCommand::SetGain(-12.0).apply(&controls);
        assert_eq!(controls.gain_db(), -12.0);
        "gain -inf".parse::<ControlCommand>().unwrap().apply(&controls);
        assert_eq!(controls.gain_db(), GAIN_DB_MIN);

        ControlCommand::SetReverb(250).apply(&controls);
        assert_eq!(controls.reverb_mix(), 100);
    }
}
