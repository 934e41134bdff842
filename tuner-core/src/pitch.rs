//! # Pitch Detection Module
//!
//! This module turns one block of audio into a pitch estimate. The detector
//! gates on RMS amplitude, windows the block, transforms it and picks the
//! dominant spectral peak inside the instrument's frequency band.
//!
//! ## Features
//! - RMS noise gate that skips the transform entirely on silence
//! - Band-limited peak search
//! - Parabolic interpolation for sub-bin accuracy
//! - Prominence-based confidence score

use crate::error::{Result, TunerError};
use crate::fft;
use log::debug;
use serde::{Deserialize, Serialize};

/// Denominators smaller than this skip parabolic interpolation.
const INTERPOLATION_EPSILON: f32 = 1e-10;

/// Tunable parameters of the pitch detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lowest frequency searched for a peak, in Hz.
    pub min_frequency: f32,
    /// Highest frequency searched for a peak, in Hz.
    pub max_frequency: f32,
    /// Blocks with an RMS below this are treated as silence.
    pub noise_floor: f32,
    /// Peak-to-mean ratio that maps to a confidence of 1.0.
    ///
    /// Empirical; worth recalibrating against real recordings.
    pub confidence_divisor: f32,
    /// Estimates at or below this confidence are not valid pitches.
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_frequency: 150.0,
            max_frequency: 750.0,
            noise_floor: 0.01,
            confidence_divisor: 10.0,
            confidence_threshold: 0.3,
        }
    }
}

/// Represents the result of analysing a single audio block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchEstimate {
    /// Detected frequency in Hz, 0.0 when no pitch was found.
    pub frequency: f32,
    /// RMS amplitude of the unwindowed block.
    pub amplitude: f32,
    /// Confidence of the detected frequency (0.0 to 1.0).
    pub confidence: f32,
}

impl PitchEstimate {
    /// The estimate reported for silence.
    pub const fn empty() -> Self {
        Self {
            frequency: 0.0,
            amplitude: 0.0,
            confidence: 0.0,
        }
    }

    /// Whether this estimate carries a usable pitch under `threshold`.
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.frequency > 0.0 && self.confidence > threshold
    }
}

/// Calculates the root-mean-square amplitude of a block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Finds the dominant peak of a magnitude spectrum inside a frequency band.
///
/// The band edges are converted to bins with `round(freq * N / sample_rate)`
/// and the upper edge is clamped to the Nyquist bin. The peak found by a
/// linear scan is refined with a parabola through its two neighbours, unless
/// it sits on either edge of the spectrum or the parabola is degenerate.
///
/// Confidence is the peak magnitude over the mean magnitude of the band,
/// divided by `config.confidence_divisor` and clamped to `[0, 1]`.
///
/// # Arguments
/// * `magnitudes` - Full magnitude spectrum (length N)
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Band limits and confidence scaling
///
/// # Returns
/// * `(frequency, confidence)` - `(0.0, 0.0)` when the band holds no peak
pub fn find_peak(magnitudes: &[f32], sample_rate: u32, config: &DetectorConfig) -> (f32, f32) {
    let n = magnitudes.len();
    if n == 0 || sample_rate == 0 {
        return (0.0, 0.0);
    }
    let bin_width = sample_rate as f32 / n as f32;
    let to_bin = |freq: f32| (freq.max(0.0) * n as f32 / sample_rate as f32).round() as usize;

    let min_bin = to_bin(config.min_frequency);
    let max_bin = to_bin(config.max_frequency).min(n / 2);
    if min_bin >= max_bin {
        debug!("Empty search band: bins {min_bin}..={max_bin}");
        return (0.0, 0.0);
    }

    let band = &magnitudes[min_bin..=max_bin];
    let (offset, peak_magnitude) = band
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0_f32), |best, (i, m)| if m > best.1 { (i, m) } else { best });
    if peak_magnitude == 0.0 {
        return (0.0, 0.0);
    }
    let peak_bin = min_bin + offset;

    let refined_bin = if peak_bin == 0 || peak_bin >= n - 1 {
        peak_bin as f32
    } else {
        let alpha = magnitudes[peak_bin - 1];
        let beta = magnitudes[peak_bin];
        let gamma = magnitudes[peak_bin + 1];
        let denominator = alpha - 2.0 * beta + gamma;
        if denominator.abs() > INTERPOLATION_EPSILON {
            peak_bin as f32 + 0.5 * (alpha - gamma) / denominator
        } else {
            peak_bin as f32
        }
    };

    let mean = band.iter().sum::<f32>() / band.len() as f32;
    let confidence = if mean > 0.0 && config.confidence_divisor > 0.0 {
        (peak_magnitude / mean / config.confidence_divisor).clamp(0.0, 1.0)
    } else {
        0.0
    };

    (refined_bin * bin_width, confidence)
}

/// Stateless block-to-pitch detector.
///
/// Holds only configuration, so one detector can serve any number of
/// sessions and blocks in any thread.
#[derive(Debug, Clone, Default)]
pub struct PitchDetector {
    config: DetectorConfig,
    /// When set, blocks of any other length are rejected.
    block_size: Option<usize>,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            block_size: None,
        }
    }

    /// Restricts the detector to blocks of exactly `block_size` samples.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn block_size(&self) -> Option<usize> {
        self.block_size
    }

    /// Analyses one block of audio.
    ///
    /// This function:
    /// 1. Rejects blocks whose length is not a power of two, or not the
    ///    configured block size when one is set
    /// 2. Gates on the RMS of the raw block (no transform on silence)
    /// 3. Applies the Hann window and runs the forward FFT
    /// 4. Extracts the peak frequency and its confidence
    ///
    /// # Arguments
    /// * `block` - Normalized samples in `[-1, 1]`
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Ok(PitchEstimate)` - The estimate, empty on silence
    /// * `Err(TunerError::InvalidInput)` - Malformed block or zero sample rate
    pub fn detect(&self, block: &[f32], sample_rate: u32) -> Result<PitchEstimate> {
        if !block.len().is_power_of_two() {
            return Err(TunerError::InvalidInput(format!(
                "block length must be a positive power of two, got {}",
                block.len()
            )));
        }
        if let Some(expected) = self.block_size.filter(|&n| n != block.len()) {
            return Err(TunerError::InvalidInput(format!(
                "block has {} samples, configured block size is {expected}",
                block.len()
            )));
        }
        if sample_rate == 0 {
            return Err(TunerError::InvalidInput("sample rate must be positive".into()));
        }

        // --- Noise Gate ---
        let amplitude = rms(block);
        if amplitude < self.config.noise_floor {
            debug!("Block gated: rms {amplitude:.5} below floor");
            return Ok(PitchEstimate::empty());
        }

        let mut real = fft::hann_window(block);
        let mut imag = vec![0.0; real.len()];
        fft::transform(&mut real, &mut imag)?;
        let spectrum = fft::magnitudes(&real, &imag);

        let (frequency, confidence) = find_peak(&spectrum, sample_rate, &self.config);

        Ok(PitchEstimate {
            frequency,
            amplitude,
            confidence,
        })
    }

    /// Whether an estimate passes this detector's confidence threshold.
    pub fn is_valid(&self, estimate: &PitchEstimate) -> bool {
        estimate.is_valid(self.config.confidence_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44100;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn rms_of_constant_block() {
        assert_relative_eq!(rms(&[0.5; 64]), 0.5, epsilon = 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn recovers_440() {
        let estimate = PitchDetector::default()
            .detect(&sine(440.0, 0.5, 8192), SAMPLE_RATE)
            .unwrap();
        let bin_width = SAMPLE_RATE as f32 / 8192.0;
        assert!((estimate.frequency - 440.0).abs() <= bin_width);
        assert!(estimate.confidence > 0.3);
        assert_relative_eq!(estimate.amplitude, 0.5 / 2f32.sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn silence_is_gated() {
        let detector = PitchDetector::default();
        assert_eq!(detector.detect(&[0.0; 4096], SAMPLE_RATE).unwrap(), PitchEstimate::empty());

        // A clean tone below the noise floor is still gated
        let quiet = sine(440.0, 0.005, 4096);
        let estimate = detector.detect(&quiet, SAMPLE_RATE).unwrap();
        assert_eq!(estimate.frequency, 0.0);
        assert_eq!(estimate.confidence, 0.0);
        assert!(!detector.is_valid(&estimate));
    }

    #[test]
    fn malformed_blocks_fail_before_gating() {
        let detector = PitchDetector::default();
        assert!(detector.detect(&[0.0; 1000], SAMPLE_RATE).is_err());
        assert!(detector.detect(&[], SAMPLE_RATE).is_err());
        assert!(detector.detect(&sine(440.0, 0.5, 1024), 0).is_err());
    }

    #[test]
    fn configured_block_size_is_enforced() {
        let detector = PitchDetector::default().with_block_size(8192);
        assert!(matches!(
            detector.detect(&sine(196.0, 0.5, 1024), SAMPLE_RATE),
            Err(TunerError::InvalidInput(_))
        ));
        // Checked before the noise gate
        assert!(detector.detect(&[0.0; 4096], SAMPLE_RATE).is_err());
        assert!(detector.detect(&sine(196.0, 0.5, 8192), SAMPLE_RATE).is_ok());
    }

    #[test]
    fn peak_outside_band_is_ignored() {
        // A strong 100 Hz tone with a weaker 400 Hz partial: only the partial is in band
        let block: Vec<f32> = sine(100.0, 0.6, 8192)
            .iter()
            .zip(sine(400.0, 0.2, 8192))
            .map(|(a, b)| a + b)
            .collect();
        let estimate = PitchDetector::default().detect(&block, SAMPLE_RATE).unwrap();
        assert!((estimate.frequency - 400.0).abs() < 6.0);
    }

    #[test]
    fn empty_band_reports_no_peak() {
        let config = DetectorConfig {
            min_frequency: 500.0,
            max_frequency: 400.0,
            ..DetectorConfig::default()
        };
        assert_eq!(find_peak(&[1.0; 1024], SAMPLE_RATE, &config), (0.0, 0.0));
    }

    #[test]
    fn all_zero_band_reports_no_peak() {
        assert_eq!(
            find_peak(&[0.0; 1024], SAMPLE_RATE, &DetectorConfig::default()),
            (0.0, 0.0)
        );
    }

    #[test]
    fn interpolation_moves_towards_heavier_neighbour() {
        let mut mags = vec![0.0; 64];
        mags[10] = 1.0;
        mags[11] = 2.0;
        mags[12] = 1.5;
        let config = DetectorConfig {
            min_frequency: 0.0,
            max_frequency: 32.0,
            ..DetectorConfig::default()
        };
        // Unit-width bins: sample_rate == N
        let (freq, _) = find_peak(&mags, 64, &config);
        assert!(freq > 11.0 && freq < 11.5);
        // p = 0.5 * (1.0 - 1.5) / (1.0 - 4.0 + 1.5)
        assert_relative_eq!(freq, 11.0 + 1.0 / 6.0, epsilon = 1e-5);
    }

    #[test]
    fn flat_spectrum_skips_interpolation() {
        // Every bin ties, so the first bin of the band wins with a zero curvature
        let config = DetectorConfig {
            min_frequency: 5.0,
            max_frequency: 32.0,
            ..DetectorConfig::default()
        };
        let (freq, _) = find_peak(&[1.0; 64], 64, &config);
        assert_relative_eq!(freq, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn confidence_rewards_prominent_peaks() {
        let config = DetectorConfig {
            min_frequency: 0.0,
            max_frequency: 32.0,
            ..DetectorConfig::default()
        };
        let flat = vec![1.0; 64];
        let (_, flat_confidence) = find_peak(&flat, 64, &config);
        assert_relative_eq!(flat_confidence, 0.1, epsilon = 1e-6);

        let mut spiky = vec![0.01; 64];
        spiky[16] = 5.0;
        let (_, spiky_confidence) = find_peak(&spiky, 64, &config);
        assert_eq!(spiky_confidence, 1.0);
    }

    #[test]
    fn validity_needs_frequency_and_confidence() {
        let estimate = PitchEstimate {
            frequency: 196.0,
            amplitude: 0.2,
            confidence: 0.31,
        };
        assert!(estimate.is_valid(0.3));
        assert!(!PitchEstimate { confidence: 0.3, ..estimate }.is_valid(0.3));
        assert!(!PitchEstimate { frequency: 0.0, ..estimate }.is_valid(0.3));
    }
}
