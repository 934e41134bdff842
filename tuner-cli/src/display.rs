//! # Reading Display
//!
//! One-line text rendering of a tuning reading with a small cent meter.

use tuner_core::{TargetString, TuningReading};

/// Maximum cent deviation shown on the meter (-50 to +50 cents).
const METER_RANGE: f32 = 50.0;

/// Character cells in the meter, odd so the centre mark is exact.
const METER_WIDTH: usize = 21;

/// Draws the needle position for a cent deviation, e.g. `[----------|--*------]`.
pub fn meter(cents: Option<f32>) -> String {
    let center = METER_WIDTH / 2;
    let needle = cents.map(|c| {
        let clamped_cents = c.clamp(-METER_RANGE, METER_RANGE);
        let position = (clamped_cents + METER_RANGE) / (2.0 * METER_RANGE) * (METER_WIDTH - 1) as f32;
        position.round() as usize
    });

    let cells: String = (0..METER_WIDTH)
        .map(|i| match needle {
            Some(n) if n == i => '*',
            _ if i == center => '|',
            _ => '-',
        })
        .collect();
    format!("[{cells}]")
}

pub fn format_reading(reading: &TuningReading) -> String {
    if !reading.is_active {
        return match &reading.pitch_name {
            Some(name) => format!(
                "{} {:>8.2} Hz ({name}), no string matched",
                meter(None),
                reading.frequency
            ),
            None => format!("{} --", meter(None)),
        };
    }
    format!(
        "{} {:<3} {:>8.2} Hz ({}) target {:>7.2} Hz {:>+7.1} cents  {}",
        meter(Some(reading.cents)),
        reading.note,
        reading.frequency,
        reading.pitch_name.as_deref().unwrap_or("?"),
        reading.target_frequency,
        reading.cents,
        reading.status
    )
}

pub fn target_names(targets: &[TargetString]) -> String {
    targets
        .iter()
        .map(|t| format!("{}={:.2}", t.name, t.frequency))
        .collect::<Vec<_>>()
        .join(", ")
}
