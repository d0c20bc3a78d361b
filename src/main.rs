use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use emu_bridge::player::{BackendFactory, OUTPUT_CHANNELS};
use emu_bridge::storage::{self, PlayerConfig};
use emu_bridge::tone::ToneEngine;
use emu_bridge::wav_header::write_pcm16;
use emu_bridge::{AdPlugAdapter, BackendAdapter, Player, TrackOptions};

/// Renders a playlist through a decoder backend without an audio device.
#[derive(Parser, Debug)]
#[command(name = "emu-bridge")]
#[command(version)]
struct Args {
    /// Files to play, in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output sample rate (overrides the config file)
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Subsong to select in every file
    #[arg(short, long)]
    track: Option<i32>,

    /// Forced stop per track, in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds of audio to render
    #[arg(short, long, default_value_t = 10.0)]
    seconds: f64,

    /// Write the rendered audio to a 16-bit WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(args: Args, config: PlayerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = config.sample_rate;
    let chunk_frames = config.render_frames.max(1);
    let factory: BackendFactory =
        Box::new(|| Box::new(AdPlugAdapter::new(ToneEngine::new())) as Box<dyn BackendAdapter>);
    let mut player = Player::new(config, factory);

    for input in &args.inputs {
        let data = std::fs::read(input)?;
        let options = TrackOptions {
            timeout: args.timeout,
            track: args.track,
        };
        player.add_track(input.to_string_lossy(), data, options);
    }
    player.play();

    let total_frames = (args.seconds * sample_rate as f64) as usize;
    let mut rendered = Vec::with_capacity(total_frames * OUTPUT_CHANNELS);
    let mut chunk = vec![0.0f32; chunk_frames * OUTPUT_CHANNELS];
    let mut frames_done = 0;
    while frames_done < total_frames {
        let frames = chunk_frames.min(total_frames - frames_done);
        let out = &mut chunk[..frames * OUTPUT_CHANNELS];
        player.render(out)?;
        rendered.extend_from_slice(out);
        frames_done += frames;
    }
    info!("rendered {} frames at {} Hz", frames_done, sample_rate);

    if let Some(path) = &args.output {
        let file = BufWriter::new(File::create(path)?);
        write_pcm16(file, OUTPUT_CHANNELS as u16, sample_rate, &rendered)?;
        info!("wrote {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&player.status())?);
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match storage::load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("could not load config: {}", err);
            PlayerConfig::default()
        }
    };
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }

    if let Err(err) = run(args, config) {
        error!("{}", err);
        std::process::exit(1);
    }
}
