// src/test_util.rs

use crate::keys::KeyId;
use crate::sample_store::{SampleAsset, SampleStore, DEFAULT_ROOT_NOTE};
use std::io::Cursor;

/// Encodes interleaved samples as an in-memory 32-bit float WAV file.
pub fn wav_bytes_f32(channels: u16, sample_rate: u32, samples: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    bytes
}

/// Encodes interleaved samples as an in-memory 16-bit integer WAV file.
pub fn wav_bytes_i16(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    bytes
}

pub fn mono_asset(samples: &[f32], sample_rate: u32) -> SampleAsset {
    SampleAsset::from_channels(vec![samples.to_vec()], sample_rate, DEFAULT_ROOT_NOTE)
}

/// A store where every key holds the same mono sample.
pub fn uniform_store(samples: &[f32], sample_rate: u32) -> SampleStore {
    let mut store = SampleStore::default();
    for key in KeyId::ALL {
        store.insert(key, mono_asset(samples, sample_rate));
    }
    store
}
