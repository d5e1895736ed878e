use anyhow::{Context, Result};
use clap::{crate_version, Parser, Subcommand};
use keysampler::audio_device;
use keysampler::audio_engine::command::ControlCommand;
use keysampler::audio_engine::helpers::{peak_level, read_wav_file, write_wav_file};
use keysampler::audio_io::init_and_run_stream;
use keysampler::controls::ControlId;
use keysampler::render::{render_offline, RenderConfig, RenderInput, ScriptEvent};
use keysampler::settings::{default_settings_path, load_settings, EngineSettings};
use keysampler::{AudioEngine, Controls, SampleStore};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "A seven-key sample instrument."
)]
struct Cli {
    /// Settings file. Defaults to AppSettings/settings.json next to the executable.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays live through an output device, reading control commands from stdin.
    Play {
        /// Directory holding C.wav through B.wav.
        #[arg(long)]
        samples: Option<PathBuf>,
        /// The output device name.
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Renders a scripted performance to a WAV file.
    Render {
        /// Directory holding C.wav through B.wav.
        #[arg(long)]
        samples: Option<PathBuf>,
        /// The WAV file to write.
        #[arg(short, long)]
        output: PathBuf,
        /// Length of the render in seconds.
        #[arg(long, default_value_t = 2.0)]
        duration: f32,
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
        #[arg(long, default_value_t = 512)]
        block_size: usize,
        #[arg(long, default_value_t = 2)]
        channels: u16,
        /// A WAV file mixed under the instrument on the first input channels.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Timed events such as 0.5:c+ 1.0:c- 1.5:gain=-6 2:reverb=30.
        events: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.clone().or_else(default_settings_path);
    let settings = match &settings_path {
        Some(path) => load_settings(path),
        None => EngineSettings::default(),
    };

    match cli.command {
        Commands::Devices {} => {
            let host_id = audio_device::default_host_id();
            let devices = audio_device::get_output_devices(host_id)?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }
            let default_name = audio_device::default_output_device_name(host_id);
            println!("Devices:");
            for (name, _) in devices {
                let marker = if Some(&name) == default_name.as_ref() {
                    " (default)"
                } else {
                    ""
                };
                println!("- {}{}", name, marker);
            }
        }
        Commands::Play { samples, device } => {
            let store = load_store(samples.as_deref(), &settings)?;
            let controls = Arc::new(Controls::new());
            let engine = AudioEngine::new(&store, Arc::clone(&controls), &settings)?;
            let xrun_count = Arc::new(AtomicUsize::new(0));

            let device_name = device.or_else(|| settings.output_device.clone());
            let (_stream, sample_rate, buffer_size) = init_and_run_stream(
                audio_device::default_host_id(),
                device_name.as_deref(),
                settings.sample_rate,
                settings.buffer_size,
                engine,
                Arc::clone(&xrun_count),
            )?;
            info!(sample_rate, buffer_size, "Playing");
            println!("Keys c d e f g a b toggle; gain <db>; reverb <pct>; status; quit");

            for line in std::io::stdin().lock().lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ControlCommand>() {
                    Ok(ControlCommand::Quit) => break,
                    Ok(ControlCommand::Status) => {
                        print_status(&controls, xrun_count.load(Ordering::Relaxed))
                    }
                    Ok(command) => command.apply(&controls),
                    Err(e) => warn!("{}", e),
                }
            }
        }
        Commands::Render {
            samples,
            output,
            duration,
            sample_rate,
            block_size,
            channels,
            input,
            events,
        } => {
            let events = events
                .iter()
                .map(|e| e.parse::<ScriptEvent>())
                .collect::<Result<Vec<_>, _>>()?;
            let store = load_store(samples.as_deref(), &settings)?;
            let mut engine =
                AudioEngine::new(&store, Arc::new(Controls::new()), &settings)?;

            let input_audio = match &input {
                Some(path) => {
                    let (data, input_channels, input_rate) = read_wav_file(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    if input_rate != sample_rate {
                        warn!(input_rate, sample_rate, "Input rate differs from render rate");
                    }
                    Some((data, input_channels))
                }
                None => None,
            };
            let render_input = input_audio.as_ref().map(|(data, input_channels)| RenderInput {
                samples: data,
                channels: *input_channels,
            });

            let config = RenderConfig {
                sample_rate,
                block_size,
                channels: channels as usize,
                duration_secs: duration,
            };
            let rendered = render_offline(&mut engine, &events, &config, render_input);
            write_wav_file(&output, &rendered, channels, sample_rate)?;
            info!(
                path = %output.display(),
                peak = peak_level(&rendered),
                "Render finished"
            );
        }
    }

    Ok(())
}

fn load_store(samples: Option<&Path>, settings: &EngineSettings) -> Result<SampleStore> {
    let dir = samples
        .map(Path::to_path_buf)
        .or_else(|| settings.sample_dir.clone())
        .context("No sample directory given; pass --samples or set sample_dir in the settings")?;
    let mut store = SampleStore::new(settings.max_sample_length_secs);
    store.load_directory(&dir)?;
    Ok(store)
}

fn print_status(controls: &Controls, xruns: usize) {
    for id in ControlId::all() {
        println!("{:>7}: {}", id, controls.display_value(id));
    }
    println!("  xruns: {}", xruns);
}
