//! Surround output player (surround-out) - Main entry point
//!
//! Plays a generated stereo test tone through the render pipeline, either
//! as stereo passthrough or decoded to 5.1 surround, until the requested
//! duration elapses or Ctrl+C is pressed.

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use surround_common::{ConfigOverrides, ConfigResolver};
use surround_out::backend::{CpalContext, SharedContext};
use surround_out::playback::{MixerProducer, MixerRing};
use surround_out::OutputStream;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frames generated per mixer iteration
const MIX_CHUNK_FRAMES: usize = 256;

/// Command-line arguments for surround-out
#[derive(Parser, Debug)]
#[command(name = "surround-out")]
#[command(about = "Stereo / 5.1 surround audio output pipeline")]
#[command(version)]
struct Args {
    /// Decode to 5.1 surround instead of stereo passthrough
    #[arg(long)]
    surround: bool,

    /// Output device name (default: system default device)
    #[arg(short, long)]
    device: Option<String>,

    /// Output volume in percent
    #[arg(short, long)]
    volume: Option<i32>,

    /// Test tone frequency in Hz
    #[arg(short, long, default_value = "440")]
    frequency: f32,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Config file path
    #[arg(short, long, env = "SURROUND_OUT_CONFIG")]
    config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_file: args.config.clone(),
        surround_decode: args.surround.then_some(true),
        device: args.device.clone(),
        volume_percent: args.volume,
    };
    let config = ConfigResolver::new(overrides)
        .resolve()
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("surround_out={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in CpalContext::list_devices().context("Failed to list devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    info!(
        "Starting surround-out: surround={}, device={}, volume={}%",
        config.surround_decode,
        config.device.as_deref().unwrap_or("default"),
        config.volume_percent
    );

    let (producer, source) =
        MixerRing::new(Some(config.ring_buffer_frames), config.sample_rate).split();

    let running = Arc::new(AtomicBool::new(true));
    let mixer = {
        let running = Arc::clone(&running);
        let sample_rate = config.sample_rate;
        let frequency = args.frequency;
        thread::Builder::new()
            .name("mixer".to_string())
            .spawn(move || run_tone_mixer(producer, sample_rate, frequency, running))
            .context("Failed to spawn mixer thread")?
    };

    let device = config.device.clone();
    let contexts = Arc::new(SharedContext::new(move || {
        CpalContext::open(device.as_deref())
    }));

    let mut output = OutputStream::new(contexts, source.clone());
    output.set_volume(config.volume_percent);
    output
        .start(config.surround_decode)
        .context("Failed to start audio output")?;

    let run_for = async {
        match args.seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs_f64(seconds)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down");
        },
        _ = run_for => {
            info!("Playback duration elapsed, shutting down");
        },
    }

    output.stop();
    running.store(false, Ordering::Relaxed);
    if mixer.join().is_err() {
        warn!("Mixer thread panicked");
    }

    let stats = output.stats();
    info!(
        "Rendered {} frames in {} callbacks (max period {} frames, {} buffer growths, {} underruns)",
        stats.frames_rendered,
        stats.callback_count,
        stats.max_period_frames,
        stats.buffer_growths,
        source.underruns()
    );

    Ok(())
}

/// Mixer thread: keeps the ring topped up with a stereo test tone.
///
/// The right channel lags a quarter period so the surround decoder has
/// both a center and a rear component to extract.
fn run_tone_mixer(
    mut producer: MixerProducer,
    sample_rate: u32,
    frequency: f32,
    running: Arc<AtomicBool>,
) {
    let step = frequency / sample_rate as f32;
    let amplitude = 0.25 * i16::MAX as f32;
    let mut phase = 0.0f32;
    let mut chunk = vec![0i16; MIX_CHUNK_FRAMES * 2];

    while running.load(Ordering::Relaxed) {
        if producer.free_frames() < MIX_CHUNK_FRAMES {
            thread::sleep(Duration::from_millis(2));
            continue;
        }

        for frame in chunk.chunks_exact_mut(2) {
            frame[0] = ((phase * TAU).sin() * amplitude) as i16;
            frame[1] = (((phase - 0.25) * TAU).sin() * amplitude) as i16;
            phase = (phase + step).fract();
        }
        producer.push_frames(&chunk);
    }
}
