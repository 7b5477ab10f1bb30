//! Health monitor
//!
//! Samples the active sink once per tick and classifies the stream as
//! Healthy, BufferCritical, Frozen or Degraded. Precedence when several
//! conditions hold: Frozen, then BufferCritical, then Degraded.

use crate::{
    buffer::BufferedRanges,
    config::HealthConfig,
    sink::SinkSnapshot,
    types::HealthStatus,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Minimum cursor movement that counts as progress
const ADVANCE_EPSILON: f64 = 0.01;

/// One tick's worth of measurements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSample {
    #[serde(skip)]
    pub timestamp: Instant,
    pub position: f64,
    pub buffered_ahead_secs: f64,
    pub position_advancing: bool,
    /// Dropped / decoded frames since the previous sample
    pub dropped_frame_ratio: f64,
    pub status: HealthStatus,
}

/// Rolling-window classifier for the active sink
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    window: VecDeque<HealthSample>,
    last_position: Option<f64>,
    last_progress: Option<Instant>,
    last_frames: Option<(u64, u64)>,
    degraded_streak: u32,
    streak: (HealthStatus, u32),
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        let window = VecDeque::with_capacity(config.window);
        Self {
            config,
            window,
            last_position: None,
            last_progress: None,
            last_frames: None,
            degraded_streak: 0,
            streak: (HealthStatus::Healthy, 0),
        }
    }

    /// Forget every baseline; used whenever the active sink or its backend changes
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_position = None;
        self.last_progress = None;
        self.last_frames = None;
        self.degraded_streak = 0;
        self.streak = (HealthStatus::Healthy, 0);
    }

    /// Take one sample and classify it.
    ///
    /// `playing` is the user's intent; an intentionally paused sink is never
    /// frozen or starving.
    pub fn observe(&mut self, now: Instant, snapshot: &SinkSnapshot, playing: bool) -> HealthStatus {
        let ranges = BufferedRanges::new(&snapshot.buffered);
        let buffered_ahead = ranges.ahead_of(snapshot.position);

        let advancing = match self.last_position {
            Some(last) => snapshot.position > last + ADVANCE_EPSILON,
            None => false,
        };
        if advancing || !playing || self.last_progress.is_none() {
            self.last_progress = Some(now);
        }
        self.last_position = Some(snapshot.position);
        let stalled_for = self
            .last_progress
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(Duration::ZERO);

        let dropped_ratio = self.frame_ratio(snapshot);
        if dropped_ratio > self.config.degraded_ratio {
            self.degraded_streak += 1;
        } else {
            self.degraded_streak = 0;
        }

        let status = if playing && stalled_for > self.config.frozen_threshold {
            HealthStatus::Frozen
        } else if playing && buffered_ahead < self.config.critical_buffer_secs {
            HealthStatus::BufferCritical
        } else if self.degraded_streak >= self.config.degraded_hysteresis {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        self.streak = if self.streak.0 == status {
            (status, self.streak.1 + 1)
        } else {
            (status, 1)
        };

        let sample = HealthSample {
            timestamp: now,
            position: snapshot.position,
            buffered_ahead_secs: buffered_ahead,
            position_advancing: advancing,
            dropped_frame_ratio: dropped_ratio,
            status,
        };
        trace!(?sample, "Health sample");
        if !status.is_healthy() {
            debug!(
                status = %status,
                streak = self.streak.1,
                buffered_ahead = buffered_ahead,
                stalled_ms = stalled_for.as_millis() as u64,
                "Stream unhealthy"
            );
        }

        if self.window.len() >= self.config.window {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        status
    }

    fn frame_ratio(&mut self, snapshot: &SinkSnapshot) -> f64 {
        let current = (snapshot.dropped_frames, snapshot.total_frames);
        let previous = self.last_frames.replace(current);
        let Some((prev_dropped, prev_total)) = previous else {
            return 0.0;
        };
        let decoded = current.1.saturating_sub(prev_total);
        if decoded == 0 {
            return 0.0;
        }
        current.0.saturating_sub(prev_dropped) as f64 / decoded as f64
    }

    /// Latest classification and how many ticks in a row it has held
    pub fn streak(&self) -> (HealthStatus, u32) {
        self.streak
    }

    /// Consecutive ticks of `status` ending at the latest sample
    pub fn consecutive(&self, status: HealthStatus) -> u32 {
        if self.streak.0 == status {
            self.streak.1
        } else {
            0
        }
    }

    pub fn last_sample(&self) -> Option<&HealthSample> {
        self.window.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &HealthSample> {
        self.window.iter()
    }

    /// Dropped-frame ratio averaged over the rolling window
    pub fn window_drop_ratio(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().map(|s| s.dropped_frame_ratio).sum::<f64>() / self.window.len() as f64
    }
}
