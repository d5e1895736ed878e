// FILE: src\audio_engine\helpers.rs
// =================================

use crate::sample_store::int_sample_scale;
use anyhow::Result;
use std::path::Path;

/// Writes interleaved float frames as a 16-bit PCM WAV file.
pub fn write_wav_file(
    path: &Path,
    interleaved: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let amplitude = i16::MAX as f32;
    for &sample in interleaved {
        writer.write_sample((sample.clamp(-1.0, 1.0) * amplitude) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Reads a WAV file as interleaved float samples. Returns the samples, the
/// channel count and the sample rate.
pub fn read_wav_file(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = int_sample_scale(spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((samples, spec.channels as usize, spec.sample_rate))
}

/// Largest absolute sample value.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
}
