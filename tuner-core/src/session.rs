//! # Session Module
//!
//! A detection session ties the stateless detector to the rolling smoothing
//! history and turns each block's estimate into a [`TuningReading`].
//!
//! Blocks must be fed in arrival order from a single producer. The session
//! holds no locks; if it is ever shared between threads, wrap the whole
//! session in a mutex so each block's read-modify-write of the history stays
//! atomic.

use crate::config::TunerConfig;
use crate::error::Result;
use crate::pitch::{PitchDetector, PitchEstimate};
use crate::smoothing::SmoothingState;
use crate::status::StatusThresholds;
use crate::tuning::{self, TargetString};
use crate::TuningReading;
use log::{debug, info};

/// State owned by one tuning session.
#[derive(Debug, Clone, Default)]
pub struct TunerSession {
    detector: PitchDetector,
    smoothing: SmoothingState,
    thresholds: StatusThresholds,
}

impl TunerSession {
    pub fn new(detector: PitchDetector, smoothing: SmoothingState, thresholds: StatusThresholds) -> Self {
        Self {
            detector,
            smoothing,
            thresholds,
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(
            config.detector(),
            SmoothingState::new(config.smoothing_capacity),
            config.thresholds.clone(),
        )
    }

    pub fn detector(&self) -> &PitchDetector {
        &self.detector
    }

    pub fn smoothing(&self) -> &SmoothingState {
        &self.smoothing
    }

    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    /// Advances the session by one raw frequency.
    ///
    /// `None` (or a non-positive frequency) marks a block without a valid
    /// pitch: the smoothing history is cleared and a `NoSignal` reading is
    /// returned. Otherwise the frequency is smoothed and compared against
    /// `selected` when given (manual mode), or against the nearest of
    /// `targets` (automatic mode).
    ///
    /// # Arguments
    /// * `raw_frequency` - Raw estimate for this block, `None` when invalid
    /// * `targets` - Current string targets, may change between calls
    /// * `selected` - Name of a manually selected target
    pub fn update(
        &mut self,
        raw_frequency: Option<f32>,
        targets: &[TargetString],
        selected: Option<&str>,
    ) -> TuningReading {
        let raw = match raw_frequency {
            Some(freq) if freq > 0.0 => freq,
            _ => {
                if !self.smoothing.is_empty() {
                    debug!("No valid pitch, clearing {} smoothed values", self.smoothing.len());
                }
                self.smoothing.clear();
                return TuningReading::no_signal();
            }
        };

        let frequency = self.smoothing.push(raw);
        let pitch_name = tuning::nearest_note(frequency).map(|note| note.name.clone());

        let target = match selected {
            Some(name) => tuning::find_target(name, targets),
            None => tuning::find_nearest_target(frequency, targets),
        };
        let Some(target) = target else {
            debug!("No target matched for {frequency:.2} Hz (selected: {selected:?})");
            return TuningReading {
                frequency,
                pitch_name,
                ..TuningReading::no_signal()
            };
        };

        let cents = tuning::cents(frequency, target.frequency);
        TuningReading {
            is_active: true,
            note: target.name.clone(),
            pitch_name,
            frequency,
            target_frequency: target.frequency,
            cents,
            status: self.thresholds.classify(cents),
        }
    }

    /// Advances the session with a detector estimate, applying the
    /// confidence threshold of this session's detector.
    pub fn process(
        &mut self,
        estimate: &PitchEstimate,
        targets: &[TargetString],
        selected: Option<&str>,
    ) -> TuningReading {
        let raw = self.detector.is_valid(estimate).then_some(estimate.frequency);
        self.update(raw, targets, selected)
    }

    /// Detects the pitch of one block and advances the session with it.
    pub fn process_block(
        &mut self,
        block: &[f32],
        sample_rate: u32,
        targets: &[TargetString],
        selected: Option<&str>,
    ) -> Result<TuningReading> {
        let estimate = self.detector.detect(block, sample_rate)?;
        Ok(self.process(&estimate, targets, selected))
    }

    /// Ends the session; the next reading starts from an empty history.
    pub fn stop(&mut self) {
        info!("Tuning session stopped");
        self.smoothing.clear();
    }
}
