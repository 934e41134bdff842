//! # Pitch Stream Module
//!
//! Pull-based delivery of pitch estimates. A [`PitchStream`] pulls blocks from
//! a [`BlockSource`] only when the consumer asks for the next estimate, so
//! stopping is simply no longer pulling: dropping the stream releases the
//! source and nothing else needs tearing down.

use crate::error::Result;
use crate::pitch::{PitchDetector, PitchEstimate};
use crossbeam_channel::Receiver;

/// A producer of fixed-length audio blocks, delivered in arrival order.
pub trait BlockSource {
    /// Returns the next block, or `None` once the source is exhausted.
    fn next_block(&mut self) -> Option<Vec<f32>>;
}

/// Blocks from a capture thread. Blocks until a block arrives and ends
/// when every sender has been dropped.
impl BlockSource for Receiver<Vec<f32>> {
    fn next_block(&mut self) -> Option<Vec<f32>> {
        self.recv().ok()
    }
}

/// Adapts any iterator of blocks into a [`BlockSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I>(pub I);

impl<I> BlockSource for IterSource<I>
where
    I: Iterator<Item = Vec<f32>>,
{
    fn next_block(&mut self) -> Option<Vec<f32>> {
        self.0.next()
    }
}

/// A lazy sequence of pitch estimates, one per block of the source.
///
/// Each item is the detector's result for one block; a malformed block
/// yields an `Err` item without ending the stream.
pub struct PitchStream<S> {
    source: S,
    detector: PitchDetector,
    sample_rate: u32,
}

impl<S: BlockSource> PitchStream<S> {
    pub fn new(source: S, detector: PitchDetector, sample_rate: u32) -> Self {
        Self {
            source,
            detector,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn detector(&self) -> &PitchDetector {
        &self.detector
    }

    /// Gives the source back, e.g. to drain blocks still in flight.
    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: BlockSource> Iterator for PitchStream<S> {
    type Item = Result<PitchEstimate>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.source.next_block()?;
        Some(self.detector.detect(&block, self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_one_estimate_per_block() {
        let blocks = vec![vec![0.0; 256], vec![0.0; 256], vec![0.0; 256]];
        let stream = PitchStream::new(IterSource(blocks.into_iter()), PitchDetector::default(), 44100);
        let estimates: Vec<_> = stream.collect::<Result<_>>().unwrap();
        assert_eq!(estimates, vec![PitchEstimate::empty(); 3]);
    }

    #[test]
    fn bad_block_does_not_end_stream() {
        let blocks = vec![vec![0.0; 100], vec![0.0; 128]];
        let mut stream =
            PitchStream::new(IterSource(blocks.into_iter()), PitchDetector::default(), 44100);
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().is_none());
    }

    #[test]
    fn channel_source_ends_when_senders_drop() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(vec![0.0; 64]).unwrap();
        drop(tx);
        let mut stream = PitchStream::new(rx, PitchDetector::default(), 44100);
        assert!(stream.next().is_some());
        assert!(stream.next().is_none());
    }
}
