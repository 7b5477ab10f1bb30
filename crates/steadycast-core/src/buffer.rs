//! Buffered-range arithmetic and back-buffer trimming
//!
//! Handles:
//! - Normalizing the sink's buffered ranges (sorting, merging near-contiguous)
//! - Buffered-ahead / buffered-behind of the playback cursor
//! - Periodic trim decisions that keep source buffers bounded

use crate::{config::TrimConfig, sink::SinkSnapshot};
use tracing::debug;

/// Ranges closer than this are treated as contiguous
const GAP_TOLERANCE: f64 = 0.1;

/// Normalized, sorted, non-overlapping buffered ranges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRanges {
    ranges: Vec<(f64, f64)>,
}

impl BufferedRanges {
    pub fn new(raw: &[(f64, f64)]) -> Self {
        let mut sorted: Vec<(f64, f64)> = raw
            .iter()
            .copied()
            .filter(|(start, end)| end > start)
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranges: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
        for (start, end) in sorted {
            match ranges.last_mut() {
                Some(last) if start - last.1 < GAP_TOLERANCE => {
                    // Contiguous or overlapping
                    last.1 = last.1.max(end);
                }
                _ => ranges.push((start, end)),
            }
        }
        Self { ranges }
    }

    pub fn ranges(&self) -> &[(f64, f64)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn containing(&self, position: f64) -> Option<(f64, f64)> {
        self.ranges
            .iter()
            .copied()
            .find(|(start, end)| position >= start - GAP_TOLERANCE && position <= *end)
    }

    /// Seconds buffered ahead of the cursor in the range that holds it
    pub fn ahead_of(&self, position: f64) -> f64 {
        self.containing(position)
            .map(|(_, end)| (end - position).max(0.0))
            .unwrap_or(0.0)
    }

    /// Seconds buffered behind the cursor across all ranges
    pub fn behind(&self, position: f64) -> f64 {
        self.ranges
            .iter()
            .filter(|(start, _)| *start < position)
            .map(|(start, end)| end.min(position) - start)
            .sum()
    }

    /// Start of the earliest buffered range
    pub fn start(&self) -> Option<f64> {
        self.ranges.first().map(|(start, _)| *start)
    }
}

/// Periodic back-buffer trim policy
#[derive(Debug, Clone)]
pub struct TrimPolicy {
    config: TrimConfig,
    ticks: u32,
}

impl TrimPolicy {
    pub fn new(config: TrimConfig) -> Self {
        Self { config, ticks: 0 }
    }

    /// Count one health tick; returns the trim point when a trim is due
    pub fn on_tick(&mut self, snapshot: &SinkSnapshot) -> Option<f64> {
        if self.config.interval_ticks == 0 {
            return None;
        }
        self.ticks += 1;
        if self.ticks < self.config.interval_ticks {
            return None;
        }
        self.ticks = 0;

        let ranges = BufferedRanges::new(&snapshot.buffered);
        let behind = ranges.behind(snapshot.position);
        if behind <= self.config.max_back_buffer_secs {
            return None;
        }

        let keep_from = snapshot.position - self.config.keep_back_buffer_secs;
        debug!(
            behind = behind,
            keep_from = keep_from,
            "Back buffer over limit, trimming"
        );
        Some(keep_from)
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_contiguous_ranges() {
        let ranges = BufferedRanges::new(&[(8.0, 12.0), (0.0, 4.0), (4.05, 8.0), (20.0, 24.0)]);
        assert_eq!(ranges.ranges(), &[(0.0, 12.0), (20.0, 24.0)]);
    }

    #[test]
    fn ahead_only_counts_range_holding_cursor() {
        let ranges = BufferedRanges::new(&[(0.0, 12.0), (20.0, 24.0)]);
        assert!((ranges.ahead_of(8.0) - 4.0).abs() < 1e-9);
        assert_eq!(ranges.ahead_of(15.0), 0.0);
        assert_eq!(BufferedRanges::default().ahead_of(1.0), 0.0);
    }

    #[test]
    fn behind_sums_ranges_before_cursor() {
        let ranges = BufferedRanges::new(&[(0.0, 10.0), (20.0, 40.0)]);
        assert!((ranges.behind(30.0) - 20.0).abs() < 1e-9);
        assert!((ranges.behind(5.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn trims_only_on_interval_and_over_limit() {
        let mut policy = TrimPolicy::new(TrimConfig {
            interval_ticks: 2,
            max_back_buffer_secs: 30.0,
            keep_back_buffer_secs: 10.0,
        });
        let snapshot = SinkSnapshot {
            position: 100.0,
            buffered: vec![(50.0, 110.0)],
            ..Default::default()
        };

        assert_eq!(policy.on_tick(&snapshot), None);
        assert_eq!(policy.on_tick(&snapshot), Some(90.0));

        let small = SinkSnapshot {
            position: 100.0,
            buffered: vec![(95.0, 110.0)],
            ..Default::default()
        };
        assert_eq!(policy.on_tick(&small), None);
        assert_eq!(policy.on_tick(&small), None);
    }
}
