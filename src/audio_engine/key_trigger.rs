// src/audio_engine/key_trigger.rs

use crate::synth::Engine;

/// Every key plays its sample at the recorded pitch.
pub const KEY_NOTE: u8 = 60;
pub const KEY_VELOCITY: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriggerState {
    #[default]
    Idle,
    Playing,
}

/// Turns a key's gate into note-on/note-off calls, one note at a time.
///
/// Only edges matter: a gate that stays high keeps the note sustained and a
/// gate that stays low does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyTrigger {
    state: TriggerState,
}

impl KeyTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TriggerState::Playing
    }

    /// Feeds the current gate value. Returns the new state when it changed.
    pub fn update<E: Engine + ?Sized>(&mut self, gate: bool, engine: &mut E) -> Option<TriggerState> {
        match (self.state, gate) {
            (TriggerState::Idle, true) => {
                engine.note_on(KEY_NOTE, KEY_VELOCITY);
                self.state = TriggerState::Playing;
                Some(self.state)
            }
            (TriggerState::Playing, false) => {
                engine.note_off(KEY_NOTE, KEY_VELOCITY, true);
                self.state = TriggerState::Idle;
                Some(self.state)
            }
            _ => None,
        }
    }

    /// Forgets the current note without telling the engine. Used when the
    /// engine has been silenced separately.
    pub fn reset(&mut self) {
        self.state = TriggerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::AudioBuffer;

    #[derive(Default)]
    struct CountingEngine {
        note_ons: usize,
        note_offs: usize,
        last_tail_off: Option<bool>,
    }

    impl Engine for CountingEngine {
        fn note_on(&mut self, note: u8, velocity: f32) {
            assert_eq!(note, KEY_NOTE);
            assert_eq!(velocity, KEY_VELOCITY);
            self.note_ons += 1;
        }

        fn note_off(&mut self, note: u8, _velocity: f32, allow_tail_off: bool) {
            assert_eq!(note, KEY_NOTE);
            self.note_offs += 1;
            self.last_tail_off = Some(allow_tail_off);
        }

        fn render_block(&mut self, _buffer: &mut AudioBuffer, _start: usize, _frames: usize) {}
    }

    fn edges(gates: &[bool]) -> (usize, usize) {
        let mut previous = false;
        let mut rising = 0;
        let mut falling = 0;
        for &g in gates {
            if g && !previous {
                rising += 1;
            }
            if !g && previous {
                falling += 1;
            }
            previous = g;
        }
        (rising, falling)
    }

    #[test]
    fn note_calls_match_gate_edges() {
        let sequences: [&[bool]; 6] = [
            &[],
            &[true, true, true],
            &[false, false, true, false, false],
            &[true, false, true, false, true],
            &[true, true, false, false, true, true, false],
            &[false, true, false, true, true, true, false, false, false, true],
        ];
        for gates in sequences {
            let mut trigger = KeyTrigger::new();
            let mut engine = CountingEngine::default();
            for &g in gates {
                trigger.update(g, &mut engine);
                assert_eq!(trigger.is_playing(), g);
            }
            let (rising, falling) = edges(gates);
            assert_eq!(engine.note_ons, rising, "gates {gates:?}");
            assert_eq!(engine.note_offs, falling, "gates {gates:?}");
        }
    }

    #[test]
    fn release_uses_tail_off() {
        let mut trigger = KeyTrigger::new();
        let mut engine = CountingEngine::default();
        assert_eq!(trigger.update(true, &mut engine), Some(TriggerState::Playing));
        assert_eq!(trigger.update(true, &mut engine), None);
        assert_eq!(trigger.update(false, &mut engine), Some(TriggerState::Idle));
        assert_eq!(engine.last_tail_off, Some(true));
    }

    #[test]
    fn reset_returns_to_idle_without_note_off() {
        let mut trigger = KeyTrigger::new();
        let mut engine = CountingEngine::default();
        trigger.update(true, &mut engine);
        trigger.reset();
        assert_eq!(trigger.state(), TriggerState::Idle);
        assert_eq!(engine.note_offs, 0);
        trigger.update(true, &mut engine);
        assert_eq!(engine.note_ons, 2);
    }
}
