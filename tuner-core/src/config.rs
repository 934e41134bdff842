//! # Configuration Module
//!
//! Tuner settings with their defaults, plus JSON saving and loading so a
//! player's custom string targets survive between runs.

use crate::error::{Result, TunerError};
use crate::pitch::{DetectorConfig, PitchDetector};
use crate::smoothing::DEFAULT_CAPACITY;
use crate::status::StatusThresholds;
use crate::tuning::TargetString;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sample rate requested from the capture device, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Samples per analysed block (~186 ms at 44.1 kHz).
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Complete tuner configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub detector: DetectorConfig,
    pub smoothing_capacity: usize,
    pub thresholds: StatusThresholds,
    pub targets: Vec<TargetString>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            detector: DetectorConfig::default(),
            smoothing_capacity: DEFAULT_CAPACITY,
            thresholds: StatusThresholds::default(),
            targets: TargetString::standard(),
        }
    }
}

impl TunerConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Checks every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TunerError::InvalidConfig(msg)) };

        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".into());
        }
        if self.block_size < 2 || !self.block_size.is_power_of_two() {
            return invalid(format!(
                "block size must be a power of two of at least 2, got {}",
                self.block_size
            ));
        }
        let band = &self.detector;
        if !(band.min_frequency >= 0.0 && band.min_frequency < band.max_frequency) {
            return invalid(format!(
                "frequency band {}..{} Hz is empty",
                band.min_frequency, band.max_frequency
            ));
        }
        if band.confidence_divisor <= 0.0 {
            return invalid("confidence divisor must be positive".into());
        }
        if !(0.0..).contains(&band.noise_floor) {
            return invalid(format!("noise floor must not be negative, got {}", band.noise_floor));
        }
        if !(0.0..=1.0).contains(&band.confidence_threshold) {
            return invalid(format!(
                "confidence threshold must lie in [0, 1], got {}",
                band.confidence_threshold
            ));
        }
        if self.smoothing_capacity == 0 {
            return invalid("smoothing capacity must be at least 1".into());
        }
        if !self.thresholds.is_ascending() {
            return invalid(format!("status thresholds must ascend: {:?}", self.thresholds));
        }
        if let Some(target) = self.targets.iter().find(|t| !(t.frequency > 0.0)) {
            return invalid(format!(
                "target '{}' has non-positive frequency {}",
                target.name, target.frequency
            ));
        }
        Ok(())
    }

    pub fn detector(&self) -> PitchDetector {
        PitchDetector::new(self.detector.clone()).with_block_size(self.block_size)
    }
}
