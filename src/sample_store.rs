// src/sample_store.rs

//! Decoded PCM samples, one per key.
//!
//! Samples are decoded once before rendering starts and never change after
//! that; voices read them through shared `Arc`s.

use crate::keys::KeyId;
use hound::{SampleFormat, WavReader};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The note at which a sample plays back at its recorded pitch.
pub const DEFAULT_ROOT_NOTE: u8 = 60;

/// Longest stretch of a sample that is kept; anything after it is dropped at load.
pub const DEFAULT_MAX_SAMPLE_LENGTH_SECS: f32 = 6.0;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("failed to decode sample for key {key}: {source}")]
    Decode {
        key: KeyId,
        #[source]
        source: hound::Error,
    },

    #[error("sample for key {0} contains no audio")]
    Empty(KeyId),

    #[error("no sample loaded for key {0}")]
    NotFound(KeyId),

    #[error("failed to read sample file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Factor that maps signed integer samples of the given bit depth onto
/// -1.0..1.0. The shift runs in i64 so 32-bit samples cannot overflow it.
pub fn int_sample_scale(bits_per_sample: u16) -> f32 {
    let bits = bits_per_sample.clamp(1, 63);
    1.0 / (1_i64 << (bits - 1)) as f32
}

/// Immutable, de-interleaved PCM audio plus the note it was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAsset {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    root_note: u8,
}

impl SampleAsset {
    /// Builds an asset from already de-interleaved channels. Channels are cut
    /// to the length of the shortest one.
    pub fn from_channels(mut channels: Vec<Vec<f32>>, sample_rate: u32, root_note: u8) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(frames);
        }
        Self {
            channels,
            sample_rate,
            root_note,
        }
    }

    /// Decodes a RIFF/WAVE container held in memory.
    pub fn decode(
        key: KeyId,
        bytes: &[u8],
        max_length_secs: Option<f32>,
    ) -> Result<Self, SampleError> {
        let mut reader =
            WavReader::new(Cursor::new(bytes)).map_err(|source| SampleError::Decode { key, source })?;
        let spec = reader.spec();
        let num_channels = spec.channels as usize;
        if num_channels == 0 || spec.sample_rate == 0 {
            return Err(SampleError::Empty(key));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|source| SampleError::Decode { key, source })?,
            SampleFormat::Int => {
                let scale = int_sample_scale(spec.bits_per_sample);
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|source| SampleError::Decode { key, source })?
            }
        };

        let mut frames = interleaved.len() / num_channels;
        if let Some(max_secs) = max_length_secs {
            let max_frames = (max_secs.max(0.0) * spec.sample_rate as f32) as usize;
            if frames > max_frames {
                debug!(%key, frames, max_frames, "Truncating sample");
                frames = max_frames;
            }
        }
        if frames == 0 {
            return Err(SampleError::Empty(key));
        }

        let channels = (0..num_channels)
            .map(|ch| {
                interleaved
                    .iter()
                    .skip(ch)
                    .step_by(num_channels)
                    .take(frames)
                    .copied()
                    .collect()
            })
            .collect();

        Ok(Self::from_channels(channels, spec.sample_rate, DEFAULT_ROOT_NOTE))
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f32 / self.sample_rate as f32
    }
}

/// One sample slot per key.
#[derive(Debug)]
pub struct SampleStore {
    assets: [Option<Arc<SampleAsset>>; KeyId::COUNT],
    max_length_secs: Option<f32>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_SAMPLE_LENGTH_SECS))
    }
}

impl SampleStore {
    pub fn new(max_length_secs: Option<f32>) -> Self {
        Self {
            assets: Default::default(),
            max_length_secs,
        }
    }

    /// Decodes `bytes` and stores the result for `key`, replacing any earlier sample.
    pub fn load(&mut self, key: KeyId, bytes: &[u8]) -> Result<(), SampleError> {
        let asset = SampleAsset::decode(key, bytes, self.max_length_secs)?;
        info!(
            %key,
            channels = asset.num_channels(),
            sample_rate = asset.sample_rate(),
            frames = asset.num_frames(),
            "Loaded sample"
        );
        self.insert(key, asset);
        Ok(())
    }

    pub fn load_file(&mut self, key: KeyId, path: &Path) -> Result<(), SampleError> {
        let bytes = fs::read(path).map_err(|source| SampleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(key, &bytes)
    }

    /// Loads `C.wav` through `B.wav` from `dir`. Stops at the first failure.
    pub fn load_directory(&mut self, dir: &Path) -> Result<(), SampleError> {
        for key in KeyId::ALL {
            self.load_file(key, &dir.join(key.sample_file_name()))?;
        }
        Ok(())
    }

    pub fn insert(&mut self, key: KeyId, asset: SampleAsset) {
        self.assets[key.index()] = Some(Arc::new(asset));
    }

    pub fn try_get(&self, key: KeyId) -> Result<&Arc<SampleAsset>, SampleError> {
        self.assets[key.index()]
            .as_ref()
            .ok_or(SampleError::NotFound(key))
    }

    /// Returns the sample for `key`.
    ///
    /// # Panics
    ///
    /// Panics if nothing was loaded for `key`. Every key must be loaded before
    /// the store is handed to an engine.
    pub fn get(&self, key: KeyId) -> &Arc<SampleAsset> {
        match self.assets[key.index()].as_ref() {
            Some(asset) => asset,
            None => panic!("no sample loaded for key {key}"),
        }
    }

    pub fn missing_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        KeyId::ALL
            .into_iter()
            .filter(|key| self.assets[key.index()].is_none())
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{wav_bytes_f32, wav_bytes_i16};

    #[test]
    fn integer_scale_covers_every_bit_depth() {
        assert_eq!(int_sample_scale(8), 1.0 / 128.0);
        assert_eq!(int_sample_scale(16), 1.0 / 32768.0);
        assert_eq!(int_sample_scale(32), 1.0 / 2_147_483_648.0);
        // Degenerate headers still give a finite factor.
        assert_eq!(int_sample_scale(0), 1.0);
        assert!(int_sample_scale(u16::MAX).is_finite());
    }

    #[test]
    fn decodes_float_mono() {
        let bytes = wav_bytes_f32(1, 44100, &[0.5, -0.5, 0.25, -0.25]);
        let asset = SampleAsset::decode(KeyId::C, &bytes, None).unwrap();
        assert_eq!(asset.num_channels(), 1);
        assert_eq!(asset.num_frames(), 4);
        assert_eq!(asset.sample_rate(), 44100);
        assert_eq!(asset.root_note(), DEFAULT_ROOT_NOTE);
        assert_eq!(asset.channel(0), &[0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn decodes_and_deinterleaves_16_bit_stereo() {
        let bytes = wav_bytes_i16(2, 48000, &[16384, -16384, 8192, -8192]);
        let asset = SampleAsset::decode(KeyId::D, &bytes, None).unwrap();
        assert_eq!(asset.num_channels(), 2);
        assert_eq!(asset.num_frames(), 2);
        assert_eq!(asset.channel(0), &[0.5, 0.25]);
        assert_eq!(asset.channel(1), &[-0.5, -0.25]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = SampleAsset::decode(KeyId::E, b"definitely not a wav file", None).unwrap_err();
        assert!(matches!(err, SampleError::Decode { key: KeyId::E, .. }));
    }

    #[test]
    fn empty_sample_is_rejected() {
        let bytes = wav_bytes_f32(1, 44100, &[]);
        let err = SampleAsset::decode(KeyId::F, &bytes, None).unwrap_err();
        assert!(matches!(err, SampleError::Empty(KeyId::F)));
    }

    #[test]
    fn long_samples_are_truncated() {
        let bytes = wav_bytes_f32(1, 10, &[0.1; 100]);
        let asset = SampleAsset::decode(KeyId::G, &bytes, Some(6.0)).unwrap();
        assert_eq!(asset.num_frames(), 60);
        assert!((asset.duration_secs() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn store_reports_missing_keys() {
        let mut store = SampleStore::default();
        assert_eq!(store.missing_keys().count(), KeyId::COUNT);
        store
            .load(KeyId::A, &wav_bytes_f32(1, 44100, &[1.0]))
            .unwrap();
        assert!(store.try_get(KeyId::A).is_ok());
        assert!(matches!(
            store.try_get(KeyId::B),
            Err(SampleError::NotFound(KeyId::B))
        ));
        assert!(!store.is_complete());
    }

    #[test]
    #[should_panic(expected = "no sample loaded for key C")]
    fn get_panics_on_missing_key() {
        SampleStore::default().get(KeyId::C);
    }

    #[test]
    fn loads_a_directory_of_samples() {
        let dir = tempfile::tempdir().unwrap();
        for key in KeyId::ALL {
            let bytes = wav_bytes_f32(1, 44100, &[key.index() as f32 / 10.0; 8]);
            fs::write(dir.path().join(key.sample_file_name()), bytes).unwrap();
        }
        let mut store = SampleStore::default();
        store.load_directory(dir.path()).unwrap();
        assert!(store.is_complete());
        assert_eq!(store.get(KeyId::E).channel(0)[0], 0.2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SampleStore::default();
        let err = store.load_directory(dir.path()).unwrap_err();
        assert!(matches!(err, SampleError::Io { .. }));
    }
}
