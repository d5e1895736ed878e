// src/fx_components/reverb.rs

//! A stereo Schroeder/Moorer reverb.
//!
//! Each channel runs eight damped comb filters in parallel followed by four
//! all-pass diffusers in series. The right channel's delay lines are a few
//! samples longer than the left's, which decorrelates the two sides; `width`
//! controls how much of that difference reaches the output.

use crate::audio_buffer::AudioBuffer;
use crate::fx_components::DspComponent;
use serde::{Deserialize, Serialize};

// Delay lengths in samples at 44.1 kHz. Scaled for other rates.
const COMB_TUNINGS: [usize; NUM_COMBS] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; NUM_ALLPASSES] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const NUM_COMBS: usize = 8;
const NUM_ALLPASSES: usize = 4;

const INPUT_GAIN: f32 = 0.015;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
const WET_SCALE: f32 = 3.0;
const SMOOTHING_SECS: f32 = 0.01;

/// Reverb settings, all in 0.0..=1.0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Params {
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            room_size: 0.7,
            damping: 0.7,
            width: 0.6,
            wet_level: 0.0,
            dry_level: 1.0,
        }
    }
}

impl Params {
    /// Sets the wet/dry balance from a single mix amount: wet = mix, dry = 1 - mix.
    pub fn with_mix(mut self, mix: f32) -> Self {
        let mix = mix.clamp(0.0, 1.0);
        self.wet_level = mix;
        self.dry_level = 1.0 - mix;
        self
    }
}

// --- Internal Building Blocks for the Reverb ---

/// One-pole low-pass in the comb feedback path; darkens the tail over time.
#[derive(Debug, Clone, Copy, Default)]
struct DampingFilter {
    z1: f32,
}

impl DampingFilter {
    #[inline(always)]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let output = input * (1.0 - coeff) + self.z1 * coeff;
        self.z1 = output;
        output
    }
}

#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    damping_filter: DampingFilter,
}

impl CombFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            damping_filter: DampingFilter::default(),
        }
    }

    #[inline(always)]
    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let output = self.buffer[self.index];
        let damped = self.damping_filter.process(output, damping);
        self.buffer[self.index] = input + damped * feedback;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.damping_filter = DampingFilter::default();
    }
}

#[derive(Debug, Clone)]
struct AllPassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllPassFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
        }
    }

    #[inline(always)]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * 0.5; // G = 0.5 (fixed)
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
        delayed - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// A value that glides linearly to a new target over a fixed number of samples.
#[derive(Debug, Clone, Copy)]
struct Smoothed {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
    ramp_len: usize,
}

impl Smoothed {
    fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
            ramp_len: 0,
        }
    }

    fn set_ramp_len(&mut self, samples: usize) {
        self.ramp_len = samples;
        self.snap();
    }

    fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp_len == 0 {
            self.snap();
            return;
        }
        self.remaining = self.ramp_len;
        self.step = (self.target - self.current) / self.ramp_len as f32;
    }

    fn snap(&mut self) {
        self.current = self.target;
        self.remaining = 0;
    }

    #[inline(always)]
    fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        self.current = if self.remaining > 0 {
            self.current + self.step
        } else {
            self.target
        };
        self.current
    }
}

struct Channel {
    combs: [CombFilter; NUM_COMBS],
    all_passes: [AllPassFilter; NUM_ALLPASSES],
}

impl Channel {
    fn new(sample_rate: f32, spread: usize) -> Self {
        let sr_factor = sample_rate / 44100.0;
        let scaled = |tuning: usize| ((tuning + spread) as f32 * sr_factor).round() as usize;
        Self {
            combs: std::array::from_fn(|i| CombFilter::new(scaled(COMB_TUNINGS[i]))),
            all_passes: std::array::from_fn(|i| AllPassFilter::new(scaled(ALLPASS_TUNINGS[i]))),
        }
    }

    #[inline(always)]
    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let comb_out = self
            .combs
            .iter_mut()
            .map(|f| f.process(input, feedback, damping))
            .sum::<f32>();
        self.all_passes
            .iter_mut()
            .fold(comb_out, |acc, f| f.process(acc))
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.all_passes.iter_mut().for_each(AllPassFilter::clear);
    }
}

// --- Main Public Reverb Struct ---

pub struct Reverb {
    params: Params,
    left: Channel,
    right: Channel,
    feedback: Smoothed,
    damping: Smoothed,
    wet1: Smoothed,
    wet2: Smoothed,
    dry: Smoothed,
    sample_rate: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32, params: Params) -> Self {
        let mut reverb = Self {
            params,
            left: Channel::new(sample_rate, 0),
            right: Channel::new(sample_rate, STEREO_SPREAD),
            feedback: Smoothed::new(0.0),
            damping: Smoothed::new(0.0),
            wet1: Smoothed::new(0.0),
            wet2: Smoothed::new(0.0),
            dry: Smoothed::new(0.0),
            sample_rate,
        };
        reverb.update_targets();
        reverb.set_smoothing(sample_rate);
        reverb
    }

    /// Takes effect gradually over the smoothing time.
    pub fn set_params(&mut self, params: Params) {
        if params == self.params {
            return;
        }
        self.params = params;
        self.update_targets();
    }

    fn update_targets(&mut self) {
        let p = self.params;
        let wet = p.wet_level.clamp(0.0, 1.0) * WET_SCALE;
        let width = p.width.clamp(0.0, 1.0);
        self.feedback
            .set_target(p.room_size.clamp(0.0, 1.0) * ROOM_SCALE + ROOM_OFFSET);
        self.damping.set_target(p.damping.clamp(0.0, 1.0) * DAMP_SCALE);
        self.wet1.set_target(0.5 * wet * (1.0 + width));
        self.wet2.set_target(0.5 * wet * (1.0 - width));
        self.dry.set_target(p.dry_level.clamp(0.0, 1.0));
    }

    fn set_smoothing(&mut self, sample_rate: f32) {
        let ramp_len = (SMOOTHING_SECS * sample_rate).round().max(0.0) as usize;
        for value in [
            &mut self.feedback,
            &mut self.damping,
            &mut self.wet1,
            &mut self.wet2,
            &mut self.dry,
        ] {
            value.set_ramp_len(ramp_len);
        }
    }

    /// Advances the network by one frame. Returns the left and right wet
    /// signals and the dry gain for this frame.
    #[inline]
    fn next_frame(&mut self, left: f32, right: f32) -> (f32, f32, f32) {
        let feedback = self.feedback.next_value();
        let damping = self.damping.next_value();
        let wet1 = self.wet1.next_value();
        let wet2 = self.wet2.next_value();
        let dry = self.dry.next_value();

        let input = (left + right) * INPUT_GAIN;
        let out_l = self.left.process(input, feedback, damping);
        let out_r = self.right.process(input, feedback, damping);

        (out_l * wet1 + out_r * wet2, out_r * wet1 + out_l * wet2, dry)
    }

    fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (wet_l, wet_r, dry) = self.next_frame(*l, *r);
            *l = wet_l + *l * dry;
            *r = wet_r + *r * dry;
        }
    }

    /// Buffers wider than stereo: channels 0 and 1 feed the network, even
    /// channels receive the left wet signal and odd channels the right one.
    /// Every channel gets the same dry level.
    fn process_multichannel(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.num_channels();
        for i in 0..buffer.num_frames() {
            let (wet_l, wet_r, dry) = self.next_frame(buffer.sample(0, i), buffer.sample(1, i));
            for ch in 0..channels {
                let wet = if ch % 2 == 0 { wet_l } else { wet_r };
                let s = &mut buffer.channel_mut(ch)[i];
                *s = wet + *s * dry;
            }
        }
    }

    fn process_mono(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            let feedback = self.feedback.next_value();
            let damping = self.damping.next_value();
            let wet1 = self.wet1.next_value();
            let dry = self.dry.next_value();

            let out = self.left.process(*s * INPUT_GAIN, feedback, damping);
            *s = out * wet1 + *s * dry;
        }
    }
}

impl DspComponent for Reverb {
    /// Rebuilds the delay lines for the new rate, which also clears them.
    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.left = Channel::new(sample_rate, 0);
        self.right = Channel::new(sample_rate, STEREO_SPREAD);
        self.set_smoothing(sample_rate);
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.set_smoothing(self.sample_rate);
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        match buffer.num_channels() {
            0 => {}
            1 => self.process_mono(buffer.channel_mut(0)),
            2 => {
                if let Some((left, right)) = buffer.stereo_mut() {
                    self.process_stereo(left, right);
                }
            }
            _ => self.process_multichannel(buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn impulse(frames: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(2, frames);
        buffer.clear();
        buffer.channel_mut(0)[0] = 1.0;
        buffer.channel_mut(1)[0] = 1.0;
        buffer
    }

    #[test]
    fn dry_only_passes_audio_through_unchanged() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(0.0));
        let left: Vec<f32> = (0..4096).map(|i| ((i as f32) * 0.01).sin()).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let mut buffer = AudioBuffer::from_channels(&[left.as_slice(), right.as_slice()]);
        reverb.process(&mut buffer);
        assert_eq!(buffer.channel(0), left.as_slice());
        assert_eq!(buffer.channel(1), right.as_slice());
    }

    #[test]
    fn silence_stays_silent() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut buffer = AudioBuffer::new(2, 1024);
        buffer.clear();
        reverb.process(&mut buffer);
        assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tail_carries_across_blocks() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut first = impulse(2048);
        reverb.process(&mut first);

        let mut second = AudioBuffer::new(2, 2048);
        second.clear();
        reverb.process(&mut second);
        let energy: f32 = second.channel(0).iter().map(|s| s * s).sum();
        assert!(energy > 0.0, "reverb tail should continue into the next block");
    }

    #[test]
    fn reset_clears_the_tail() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut first = impulse(2048);
        reverb.process(&mut first);
        reverb.reset();

        let mut second = AudioBuffer::new(2, 2048);
        second.clear();
        reverb.process(&mut second);
        assert!(second.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn width_decorrelates_channels() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut buffer = impulse(4096);
        reverb.process(&mut buffer);
        assert_ne!(buffer.channel(0), buffer.channel(1));
    }

    #[test]
    fn mix_changes_are_smoothed() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(0.0));
        reverb.set_params(Params::default().with_mix(1.0));
        let mut buffer = AudioBuffer::from_channels(&[&[1.0; 8], &[1.0; 8]]);
        reverb.process(&mut buffer);
        // Dry gain is still close to one at the start of the ramp.
        assert!(buffer.channel(0)[0] > 0.99);
    }

    #[test]
    fn wide_buffers_mirror_the_stereo_pair() {
        let mut stereo = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut wide = Reverb::new(SR, Params::default().with_mix(1.0));

        let mut reference = impulse(4096);
        stereo.process(&mut reference);

        let mut buffer = AudioBuffer::new(4, 4096);
        buffer.clear();
        for ch in 0..4 {
            buffer.channel_mut(ch)[0] = 1.0;
        }
        wide.process(&mut buffer);

        assert_eq!(buffer.channel(0), reference.channel(0));
        assert_eq!(buffer.channel(1), reference.channel(1));
        assert_eq!(buffer.channel(2), reference.channel(0));
        assert_eq!(buffer.channel(3), reference.channel(1));
        let tail: f32 = buffer.channel(2)[1..].iter().map(|s| s * s).sum();
        assert!(tail > 0.0);
    }

    #[test]
    fn extra_channels_get_the_dry_level() {
        // Fully wet: dry content on channels past the stereo pair is removed.
        let mut reverb = Reverb::new(SR, Params::default().with_mix(1.0));
        let mut buffer = AudioBuffer::from_channels(&[&[0.0; 64], &[0.0; 64], &[1.0; 64]]);
        reverb.process(&mut buffer);
        assert!(buffer.channel(2).iter().all(|&s| s == 0.0));

        // Fully dry: every channel passes unchanged.
        let mut reverb = Reverb::new(SR, Params::default().with_mix(0.0));
        let mut buffer = AudioBuffer::from_channels(&[&[0.1; 64], &[0.2; 64], &[0.3; 64]]);
        reverb.process(&mut buffer);
        assert!(buffer.channel(2).iter().all(|&s| s == 0.3));
    }

    #[test]
    fn mono_buffers_are_processed() {
        let mut reverb = Reverb::new(SR, Params::default().with_mix(0.0));
        let mut buffer = AudioBuffer::from_channels(&[&[0.5, 0.25]]);
        reverb.process(&mut buffer);
        assert_eq!(buffer.channel(0), &[0.5, 0.25]);
    }
}
