//! # Tuning Status Module
//!
//! Maps a signed cent deviation onto a discrete tuning status. The
//! classification is a pure function: no history, no hysteresis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a string is from its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningStatus {
    NoSignal,
    InTune,
    SlightlySharp,
    SlightlyFlat,
    Sharp,
    Flat,
    VerySharp,
    VeryFlat,
}

impl TuningStatus {
    /// Distance rank from in tune: 0 for `InTune` up to 3 for the `Very*`
    /// variants. `NoSignal` has no rank.
    pub fn severity(self) -> Option<u8> {
        match self {
            TuningStatus::NoSignal => None,
            TuningStatus::InTune => Some(0),
            TuningStatus::SlightlySharp | TuningStatus::SlightlyFlat => Some(1),
            TuningStatus::Sharp | TuningStatus::Flat => Some(2),
            TuningStatus::VerySharp | TuningStatus::VeryFlat => Some(3),
        }
    }

    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            TuningStatus::SlightlySharp | TuningStatus::Sharp | TuningStatus::VerySharp
        )
    }

    pub fn is_flat(self) -> bool {
        matches!(
            self,
            TuningStatus::SlightlyFlat | TuningStatus::Flat | TuningStatus::VeryFlat
        )
    }
}

impl fmt::Display for TuningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TuningStatus::NoSignal => "no signal",
            TuningStatus::InTune => "in tune",
            TuningStatus::SlightlySharp => "slightly sharp",
            TuningStatus::SlightlyFlat => "slightly flat",
            TuningStatus::Sharp => "sharp",
            TuningStatus::Flat => "flat",
            TuningStatus::VerySharp => "very sharp",
            TuningStatus::VeryFlat => "very flat",
        };
        f.write_str(label)
    }
}

/// Ascending absolute cent limits separating the status bands.
///
/// Each limit is inclusive: a deviation of exactly `in_tune` cents is still
/// in tune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub in_tune: f32,
    pub slight: f32,
    pub moderate: f32,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            in_tune: 5.0,
            slight: 15.0,
            moderate: 25.0,
        }
    }
}

impl StatusThresholds {
    /// Whether the limits are positive and strictly ascending.
    pub fn is_ascending(&self) -> bool {
        0.0 < self.in_tune && self.in_tune < self.slight && self.slight < self.moderate
    }

    /// Classifies a cent deviation.
    pub fn classify(&self, cents: f32) -> TuningStatus {
        let magnitude = cents.abs();
        let sharp = cents > 0.0;
        if magnitude <= self.in_tune {
            TuningStatus::InTune
        } else if magnitude <= self.slight {
            if sharp { TuningStatus::SlightlySharp } else { TuningStatus::SlightlyFlat }
        } else if magnitude <= self.moderate {
            if sharp { TuningStatus::Sharp } else { TuningStatus::Flat }
        } else if sharp {
            TuningStatus::VerySharp
        } else {
            TuningStatus::VeryFlat
        }
    }
}
