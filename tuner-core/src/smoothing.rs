//! # Smoothing Module
//!
//! Rolling median over the most recent raw frequency estimates. A median
//! drops single-block outliers such as octave jumps instead of averaging them
//! into the displayed pitch.

use std::collections::VecDeque;

/// Default number of raw estimates retained.
pub const DEFAULT_CAPACITY: usize = 5;

/// Bounded history of raw frequencies for one detection session.
///
/// The history never holds more than `capacity` values; the oldest value is
/// evicted first. Call [`SmoothingState::clear`] whenever a block carries no
/// valid pitch so stale values never bleed into the next note.
#[derive(Debug, Clone)]
pub struct SmoothingState {
    history: VecDeque<f32>,
    capacity: usize,
}

impl Default for SmoothingState {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SmoothingState {
    /// Creates an empty history. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Records a raw frequency and returns the smoothed value.
    pub fn push(&mut self, frequency: f32) -> f32 {
        self.history.push_back(frequency);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        // The history was just pushed to, so it is never empty here
        self.current().unwrap_or(frequency)
    }

    /// The smoothed value of the current history, if any.
    ///
    /// Median once three or more values are held, plain mean below that.
    pub fn current(&self) -> Option<f32> {
        match self.history.len() {
            0 => None,
            len @ (1 | 2) => Some(self.history.iter().sum::<f32>() / len as f32),
            len => {
                let mut sorted: Vec<f32> = self.history.iter().copied().collect();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = len / 2;
                if len % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
        }
    }

    /// Drops the whole history.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}
