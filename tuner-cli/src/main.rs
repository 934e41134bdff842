//! # string-tuner - Command Line Tuner
//!
//! Terminal front end for the tuner core. It feeds blocks from the
//! microphone or a WAV file through a tuning session and prints one line per
//! reading.
//!
//! ## Architecture
//! - **Capture**: CPAL callback thread cutting fixed-size blocks
//! - **Communication**: Bounded crossbeam channel carrying blocks in order
//! - **Analysis**: Main thread pulling estimates from a `PitchStream`

mod display;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, select};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tuner_core::{
    BlockSource, IterSource, PitchStream, TargetString, TunerConfig, TunerSession, audio, tuning,
};

/// Blocks buffered between the capture callback and the analysis loop.
const BLOCK_QUEUE: usize = 4;

#[derive(Parser)]
#[command(name = "string-tuner")]
#[command(about = "Real-time tuner for four-string instruments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tune from the default microphone
    Listen {
        #[command(flatten)]
        tuner: TunerArgs,

        /// Stop after this many seconds (runs until interrupted otherwise)
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Run a WAV recording through the tuner
    Analyze {
        /// WAV file to analyze
        path: PathBuf,

        #[command(flatten)]
        tuner: TunerArgs,
    },

    /// Write the default configuration as JSON
    WriteConfig {
        /// Destination file
        path: PathBuf,
    },
}

#[derive(Args)]
struct TunerArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// String target as NAME=HZ, repeatable; replaces the configured targets
    #[arg(long = "target", value_parser = tuning::parse_target)]
    targets: Vec<TargetString>,

    /// Tune against this string only (manual mode)
    #[arg(long = "string")]
    selected: Option<String>,

    /// Requested capture sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per analysed block (power of two)
    #[arg(long)]
    block_size: Option<usize>,
}

impl TunerArgs {
    /// Builds the effective configuration: file (or defaults), then flags.
    fn resolve(&self) -> Result<TunerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = TunerConfig::load(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                info!("Loaded config from {}", path.display());
                config
            }
            None => TunerConfig::default(),
        };
        if !self.targets.is_empty() {
            config.targets = self.targets.clone();
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(size) = self.block_size {
            config.block_size = size;
        }
        config.validate()?;

        if let Some(name) = &self.selected {
            if tuning::find_target(name, &config.targets).is_none() {
                bail!(
                    "Unknown string '{name}'; configured strings are {}",
                    display::target_names(&config.targets)
                );
            }
        }
        Ok(config)
    }
}

/// Microphone blocks with an optional time limit.
struct TimedSource {
    blocks: Receiver<Vec<f32>>,
    deadline: Receiver<Instant>,
}

impl BlockSource for TimedSource {
    fn next_block(&mut self) -> Option<Vec<f32>> {
        select! {
            recv(self.blocks) -> msg => msg.ok(),
            recv(self.deadline) -> _ => {
                info!("Time limit reached");
                None
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Listen { tuner, seconds } => listen(&tuner, seconds),
        Commands::Analyze { path, tuner } => analyze(&path, &tuner),
        Commands::WriteConfig { path } => {
            TunerConfig::default().save(&path)?;
            info!("Default configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn listen(args: &TunerArgs, seconds: Option<u64>) -> Result<()> {
    let config = args.resolve()?;
    let (block_tx, block_rx) = crossbeam_channel::bounded::<Vec<f32>>(BLOCK_QUEUE);

    let (input, sample_rate) =
        audio::start_audio_capture(block_tx, config.sample_rate, config.block_size)?;
    info!(
        "Listening for {} ({})",
        display::target_names(&config.targets),
        args.selected.as_deref().unwrap_or("automatic")
    );

    let deadline = match seconds {
        Some(secs) => crossbeam_channel::after(Duration::from_secs(secs)),
        None => crossbeam_channel::never(),
    };
    let source = TimedSource {
        blocks: block_rx,
        deadline,
    };

    let mut session = TunerSession::from_config(&config);
    let mut estimates = PitchStream::new(source, config.detector(), sample_rate);
    for estimate in estimates.by_ref() {
        let reading = session.process(&estimate?, &config.targets, args.selected.as_deref());
        println!("{}", display::format_reading(&reading));
    }

    // Stop: release the device first so no new blocks arrive, then discard
    // whatever is still queued.
    if let Err(e) = input.pause() {
        warn!("Error pausing stream: {e}");
    }
    drop(input);
    let source = estimates.into_source();
    let discarded = source.blocks.try_iter().count();
    if discarded > 0 {
        info!("Discarded {discarded} in-flight block(s)");
    }
    session.stop();
    Ok(())
}

fn analyze(path: &Path, args: &TunerArgs) -> Result<()> {
    let config = args.resolve()?;
    let (blocks, sample_rate) = audio::wav_blocks(path, config.block_size)?;
    if blocks.is_empty() {
        bail!(
            "{} is shorter than one {}-sample block",
            path.display(),
            config.block_size
        );
    }

    let mut session = TunerSession::from_config(&config);
    let estimates = PitchStream::new(IterSource(blocks.into_iter()), config.detector(), sample_rate);

    let mut in_tune = 0;
    let mut active = 0;
    for (index, estimate) in estimates.enumerate() {
        let reading = session.process(&estimate?, &config.targets, args.selected.as_deref());
        if reading.is_active {
            active += 1;
        }
        if reading.is_in_tune() {
            in_tune += 1;
        }
        let seconds = (index * config.block_size) as f32 / sample_rate as f32;
        println!("{seconds:7.2}s  {}", display::format_reading(&reading));
    }
    session.stop();

    info!("{active} block(s) with a matched string, {in_tune} in tune");
    Ok(())
}
