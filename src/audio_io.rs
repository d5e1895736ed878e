// src/audio_io.rs

use crate::audio_buffer::AudioBuffer;
use crate::audio_device::find_output_device;
use crate::audio_engine::{AudioEngine, AudioProcessor};
use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, HostId, Sample, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Block size assumed when the device picks its own buffer size.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Opens the output device, prepares `engine` for its rate and starts a stream
/// that drives it. Returns the stream with the active sample rate and block
/// size. The stream stops when dropped.
pub fn init_and_run_stream(
    host_id: HostId,
    output_device_name: Option<&str>,
    requested_sample_rate: Option<u32>,
    requested_buffer_size: Option<u32>,
    engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
) -> Result<(Stream, u32, u32)> {
    let output_device = find_output_device(host_id, output_device_name)?;
    info!("Using output device: {}", output_device.name()?);

    let default_output_config = output_device.default_output_config()?;
    let sample_format = default_output_config.sample_format();

    let mut final_output_config: StreamConfig = default_output_config.into();
    if let Some(sr) = requested_sample_rate {
        final_output_config.sample_rate = cpal::SampleRate(sr);
    }
    if let Some(bs) = requested_buffer_size {
        final_output_config.buffer_size = BufferSize::Fixed(bs);
    }

    let active_sr = final_output_config.sample_rate.0;
    let active_bs = match final_output_config.buffer_size {
        BufferSize::Fixed(size) => size,
        BufferSize::Default => DEFAULT_BLOCK_SIZE,
    };

    fn run<T>(
        device: &Device,
        config: &StreamConfig,
        engine: AudioEngine,
        block_size: usize,
        xrun_count: Arc<AtomicUsize>,
    ) -> Result<Stream>
    where
        T: Sample + cpal::SizedSample + FromSample<f32>,
    {
        let stream = build_output_stream::<T>(device, config, engine, block_size, xrun_count)?;
        stream.play()?;
        Ok(stream)
    }

    let block_size = active_bs as usize;
    let stream = match sample_format {
        SampleFormat::F32 => run::<f32>(&output_device, &final_output_config, engine, block_size, xrun_count)?,
        SampleFormat::I16 => run::<i16>(&output_device, &final_output_config, engine, block_size, xrun_count)?,
        SampleFormat::U16 => run::<u16>(&output_device, &final_output_config, engine, block_size, xrun_count)?,
        format => return Err(anyhow::anyhow!("Unsupported sample format {}", format)),
    };

    info!(
        "Started output stream with Sample Rate: {} Hz, Buffer Size: {} Samples",
        active_sr, active_bs
    );

    Ok((stream, active_sr, active_bs))
}

fn build_output_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut engine: AudioEngine,
    block_size: usize,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    if channels == 0 {
        return Err(anyhow::anyhow!("Output device reports no channels"));
    }
    let err_fn = {
        let xrun_count_clone = xrun_count.clone();
        move |err| {
            warn!("an error occurred on output stream: {}", err);
            xrun_count_clone.fetch_add(1, Ordering::Relaxed);
        }
    };

    engine.prepare(config.sample_rate.0 as f32, block_size);
    let mut buffer = AudioBuffer::new(channels, block_size.max(1));

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Devices may hand over more frames than requested.
            for chunk in data.chunks_mut(channels * buffer.capacity()) {
                buffer.set_num_frames(chunk.len() / channels);
                buffer.clear();
                engine.process_block(&mut buffer);
                buffer.write_interleaved_with(chunk, channels, T::from_sample);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
