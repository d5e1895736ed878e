// src/render.rs

//! Offline rendering: runs the engine without a device, applying a timed
//! script of control changes.

use crate::audio_buffer::AudioBuffer;
use crate::audio_engine::command::{CommandError, ControlCommand};
use crate::audio_engine::{AudioEngine, AudioProcessor};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("expected <seconds>:<command>, got {0:?}")]
    Syntax(String),
    #[error("invalid time in {0:?}")]
    Time(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// A control change at a point in time, written `<seconds>:<command>`, e.g.
/// `0.5:c+`, `1.0:c-`, `2:gain=-6`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptEvent {
    pub time_secs: f32,
    pub command: ControlCommand,
}

impl FromStr for ScriptEvent {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (time, command) = s
            .split_once(':')
            .ok_or_else(|| ScriptError::Syntax(s.to_string()))?;
        let time_secs = time
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| ScriptError::Time(s.to_string()))?;
        Ok(Self {
            time_secs,
            command: command.parse()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: usize,
    pub duration_secs: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
            channels: 2,
            duration_secs: 1.0,
        }
    }
}

/// Interleaved input fed under the instrument output.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub samples: &'a [f32],
    pub channels: usize,
}

/// Prepares `engine` and renders `config.duration_secs` of audio, returned
/// interleaved. Events take effect at the frame nearest their time;
/// blocks are split there so timing does not depend on the block size.
pub fn render_offline(
    engine: &mut AudioEngine,
    events: &[ScriptEvent],
    config: &RenderConfig,
    input: Option<RenderInput<'_>>,
) -> Vec<f32> {
    let channels = config.channels.max(1);
    let block_size = config.block_size.max(1);
    let total_frames = (config.duration_secs.max(0.0) * config.sample_rate as f32).round() as usize;

    let mut events: Vec<(usize, ControlCommand)> = events
        .iter()
        .map(|e| {
            let frame = (e.time_secs * config.sample_rate as f32).round() as usize;
            (frame, e.command)
        })
        .collect();
    events.sort_by_key(|(frame, _)| *frame);

    engine.prepare(config.sample_rate as f32, block_size);
    let mut buffer = AudioBuffer::new(channels, block_size);
    let mut output = vec![0.0; total_frames * channels];

    let mut next_event = 0;
    let mut position = 0;
    while position < total_frames {
        while next_event < events.len() && events[next_event].0 <= position {
            let command = events[next_event].1;
            debug!(frame = position, ?command, "Applying script event");
            command.apply(engine.controls());
            next_event += 1;
        }

        let mut frames = block_size.min(total_frames - position);
        if let Some(&(frame, _)) = events.get(next_event) {
            frames = frames.min(frame - position);
        }

        buffer.set_num_frames(frames);
        buffer.clear();
        if let Some(input) = input {
            fill_input(&mut buffer, input, position);
        }
        engine.process_block(&mut buffer);

        let start = position * channels;
        buffer.write_interleaved(&mut output[start..start + frames * channels], channels);
        position += frames;
    }

    for (_, command) in &events[next_event..] {
        debug!(?command, "Script event past the end of the render");
    }
    output
}

fn fill_input(buffer: &mut AudioBuffer, input: RenderInput<'_>, position: usize) {
    if input.channels == 0 {
        return;
    }
    let frames = buffer.num_frames();
    let len = input.samples.len();
    let start = position.saturating_mul(input.channels).min(len);
    let end = (position + frames).saturating_mul(input.channels).min(len);
    let available = buffer.copy_from_interleaved(&input.samples[start..end], input.channels);

    // Past the end of the input the block is silent.
    buffer.set_num_frames(frames);
    for ch in 0..buffer.num_channels() {
        buffer.channel_mut(ch)[available..].fill(0.0);
    }
}
