//! # Audio Capture Module
//!
//! This module supplies the blocks the detector consumes. Live input comes
//! from the default microphone through CPAL (Cross-Platform Audio Library);
//! recorded input comes from WAV files through hound.
//!
//! ## Features
//! - Automatic audio device selection
//! - Closest supported sample rate, any channel count (down-mixed to mono)
//! - Fixed-size block accumulation
//! - Streaming of blocks over a crossbeam channel

use anyhow::{Context, Result, anyhow, bail};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use log::{info, warn};
use std::path::Path;

/// Collects interleaved audio frames into fixed-size mono blocks.
#[derive(Debug)]
pub struct BlockAccumulator {
    block_size: usize,
    channels: usize,
    buffer: Vec<f32>,
}

impl BlockAccumulator {
    /// Fails unless `block_size` is a positive power of two.
    pub fn new(block_size: usize, channels: usize) -> Result<Self> {
        if !block_size.is_power_of_two() {
            bail!("Block size must be a positive power of two, got {block_size}");
        }
        Ok(Self {
            block_size,
            channels: channels.max(1),
            buffer: Vec::with_capacity(block_size * 2),
        })
    }

    /// Appends interleaved samples and returns every block completed by them.
    ///
    /// A trailing partial frame is ignored.
    pub fn push(&mut self, data: &[f32]) -> Vec<Vec<f32>> {
        let channels = self.channels;
        self.buffer.extend(
            data.chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );

        let mut blocks = Vec::new();
        while self.buffer.len() >= self.block_size {
            blocks.push(self.buffer.drain(..self.block_size).collect());
        }
        blocks
    }

    /// Number of mono samples waiting for a block to fill.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 input format with the fewest channels and the sample rate
///    closest to `sample_rate`
/// 3. Sets up a callback that down-mixes to mono, cuts `block_size` blocks
///    and sends them to the analysis side
///
/// Blocks are sent with `try_send`: if a bounded channel is full the new
/// block is dropped, so delivered blocks always keep their capture order.
///
/// # Arguments
/// * `sender` - Channel sender for streaming blocks to the analysis side
/// * `sample_rate` - Desired sample rate in Hz
/// * `block_size` - Samples per block
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and the actual sample rate
/// * `Err(e)` - Invalid block size, no device, no usable format, or the host
///   refused the stream (which is how a denied microphone permission shows up)
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    sample_rate: u32,
    block_size: usize,
) -> Result<(cpal::Stream, u32)> {
    // Checked before the device is touched
    BlockAccumulator::new(block_size, 1)?;

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("Failed to query input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, sample_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = sample_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    info!("Selected sample rate: {rate} Hz, {channels} channel(s), {block_size}-sample blocks");

    let err_fn = |err| warn!("An error occurred on the audio stream: {err}");

    let mut accumulator = BlockAccumulator::new(block_size, channels)?;

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for block in accumulator.push(data) {
                    match sender.try_send(block) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => warn!("Analysis is falling behind, dropping a block"),
                        // The consumer stopped pulling; nothing left to deliver to.
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                }
            },
            err_fn,
            None,
        )
        .context("Failed to open the input stream (is microphone access allowed?)")?;

    stream.play().context("Failed to start the input stream")?;

    Ok((stream, rate))
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Among those, configurations covering
/// the target rate win, then fewer channels.
///
/// # Returns
/// * `Some(config)` - Best matching configuration
/// * `None` - No f32 configuration found
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (distance, c.channels())
        })
}

/// Reads a WAV file into fixed-size mono blocks.
///
/// Integer samples are scaled into `[-1, 1]` by their bit depth. The last
/// partial block is discarded rather than padded.
///
/// # Returns
/// * `Ok((blocks, sample_rate))` - Blocks in file order and the file's rate
pub fn wav_blocks(path: impl AsRef<Path>, block_size: usize) -> Result<(Vec<Vec<f32>>, u32)> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    let mut accumulator = BlockAccumulator::new(block_size, spec.channels as usize)?;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let blocks = accumulator.push(&samples);
    info!(
        "Read {} block(s) of {block_size} samples from {} ({} Hz, {} channel(s))",
        blocks.len(),
        path.display(),
        spec.sample_rate,
        spec.channels
    );
    Ok((blocks, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_full_blocks_only() {
        let mut accumulator = BlockAccumulator::new(4, 1).unwrap();
        assert!(accumulator.push(&[0.1, 0.2, 0.3]).is_empty());
        let blocks = accumulator.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);
        assert_eq!(blocks, vec![vec![0.1, 0.2, 0.3, 0.4], vec![0.5, 0.6, 0.7, 0.8]]);
        assert_eq!(accumulator.pending(), 1);
    }

    #[test]
    fn downmixes_interleaved_frames() {
        let mut accumulator = BlockAccumulator::new(2, 2).unwrap();
        let blocks = accumulator.push(&[1.0, 0.0, 0.5, 0.5]);
        assert_eq!(blocks, vec![vec![0.5, 0.5]]);
    }

    #[test]
    fn reads_wav_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..(1024 * 2 + 100) {
            let v = if i % 2 == 0 { i16::MAX } else { i16::MIN };
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let (blocks, rate) = wav_blocks(&path, 1024).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().flatten().all(|s| (-1.0..=1.0).contains(s)));
        assert!((blocks[0][0] - 1.0).abs() < 1e-3);
        assert_eq!(blocks[0][1], -1.0);
    }

    #[test]
    fn rejects_unusable_block_sizes() {
        assert!(BlockAccumulator::new(0, 1).is_err());
        assert!(BlockAccumulator::new(1000, 2).is_err());
        assert!(BlockAccumulator::new(1, 1).is_ok());
    }

    #[test]
    fn wav_blocks_rejects_unusable_block_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..64 {
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        assert!(wav_blocks(&path, 0).is_err());
        assert!(wav_blocks(&path, 48).is_err());
        assert_eq!(wav_blocks(&path, 16).unwrap().0.len(), 4);
    }

    #[test]
    fn missing_wav_is_an_error() {
        assert!(wav_blocks("/definitely/not/here.wav", 1024).is_err());
    }
}
