// tuner-core/src/lib.rs

//! The core logic for the string instrument tuner.
//! This crate is responsible for pitch detection, smoothing, string
//! matching and tuning classification. It is completely headless
//! and contains no rendering code.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod session;
pub mod smoothing;
pub mod status;
pub mod stream;
pub mod tuning;

pub use config::TunerConfig;
pub use error::{Result, TunerError};
pub use pitch::{DetectorConfig, PitchDetector, PitchEstimate};
pub use session::TunerSession;
pub use smoothing::SmoothingState;
pub use status::{StatusThresholds, TuningStatus};
pub use stream::{BlockSource, IterSource, PitchStream};
pub use tuning::TargetString;

/// Represents the tuning state reported for a single audio block.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningReading {
    /// Whether a pitch was matched against a target this block.
    pub is_active: bool,
    /// Name of the target string being tuned, empty without a match.
    pub note: String,
    /// Nearest chromatic note to the smoothed frequency (e.g. "G3").
    pub pitch_name: Option<String>,
    /// Smoothed frequency in Hz.
    pub frequency: f32,
    /// Frequency of the target string in Hz.
    pub target_frequency: f32,
    /// Deviation from the target in cents (positive = sharp).
    pub cents: f32,
    pub status: TuningStatus,
}

impl TuningReading {
    /// The reading reported when there is nothing to tune against.
    pub fn no_signal() -> Self {
        Self {
            is_active: false,
            note: String::new(),
            pitch_name: None,
            frequency: 0.0,
            target_frequency: 0.0,
            cents: 0.0,
            status: TuningStatus::NoSignal,
        }
    }

    /// Whether the reading is in tune.
    pub fn is_in_tune(&self) -> bool {
        self.status == TuningStatus::InTune
    }
}
