//! # Musical Tuning Module
//!
//! This module provides the musical side of the tuner: cent deviations,
//! string targets and chromatic note names.
//!
//! ## Features
//! - Cent deviation between a measured and a target frequency
//! - Nearest-string matching by musical (logarithmic) distance
//! - Standard G/D/A/E string targets
//! - Equal temperament note table (C0 to B8, A4 = 440 Hz)

use crate::error::{Result, TunerError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Represents a single chromatic note with its name and frequency.
#[derive(Debug, Clone)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Statically computed equal temperament notes from C0 to B8.
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    // A4 is 57 semitones above C0.
    (0..108)
        .map(|i| Note {
            name: format!("{}{}", NOTE_NAMES[i % 12], i / 12),
            frequency: 440.0 * 2.0_f32.powf((i as f32 - 57.0) / 12.0),
        })
        .collect()
});

/// Finds the closest chromatic note to a given frequency.
///
/// Distance is measured in cents, so the boundary between two notes sits at
/// the quarter-tone rather than at the arithmetic midpoint.
///
/// # Returns
/// * `Some(note)` - Closest note in the table
/// * `None` - Frequency is not positive
pub fn nearest_note(freq: f32) -> Option<&'static Note> {
    if freq <= 0.0 {
        return None;
    }
    NOTES.iter().min_by(|a, b| {
        let diff_a = cents(freq, a.frequency).abs();
        let diff_b = cents(freq, b.frequency).abs();
        diff_a.total_cmp(&diff_b)
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// Non-positive inputs yield 0.0 rather than an error.
pub fn cents(measured: f32, target: f32) -> f32 {
    if measured <= 0.0 || target <= 0.0 {
        return 0.0;
    }
    1200.0 * (measured / target).log2()
}

/// A named string and the frequency it should sound at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetString {
    pub name: String,
    pub frequency: f32,
}

impl TargetString {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }

    /// Standard tuning for a four-string instrument, lowest string first.
    pub fn standard() -> Vec<TargetString> {
        vec![
            TargetString::new("G", 196.00),
            TargetString::new("D", 293.66),
            TargetString::new("A", 440.00),
            TargetString::new("E", 659.26),
        ]
    }
}

/// Parses a `NAME=HZ` target, e.g. `"G=196.0"`.
pub fn parse_target(spec: &str) -> Result<TargetString> {
    let (name, freq) = spec
        .split_once('=')
        .ok_or_else(|| TunerError::InvalidConfig(format!("expected NAME=HZ, got '{spec}'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(TunerError::InvalidConfig(format!("target '{spec}' has no name")));
    }
    let frequency: f32 = freq
        .trim()
        .parse()
        .map_err(|_| TunerError::InvalidConfig(format!("'{freq}' is not a frequency")))?;
    if !(frequency > 0.0 && frequency.is_finite()) {
        return Err(TunerError::InvalidConfig(format!(
            "target frequency must be positive, got {frequency}"
        )));
    }
    Ok(TargetString::new(name, frequency))
}

/// Finds the target closest to `freq` in cents.
///
/// Ties go to the earliest target in `targets`.
///
/// # Returns
/// * `Some(target)` - Nearest target
/// * `None` - `freq` is not positive or `targets` is empty
pub fn find_nearest_target(freq: f32, targets: &[TargetString]) -> Option<&TargetString> {
    if freq <= 0.0 {
        return None;
    }
    targets.iter().fold(None, |best: Option<&TargetString>, target| match best {
        Some(current) if cents(freq, current.frequency).abs() <= cents(freq, target.frequency).abs() => {
            Some(current)
        }
        _ => Some(target),
    })
}

/// Looks a target up by its name.
pub fn find_target<'a>(name: &str, targets: &'a [TargetString]) -> Option<&'a TargetString> {
    targets.iter().find(|target| target.name == name)
}
