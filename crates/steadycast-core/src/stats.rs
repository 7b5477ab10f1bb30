//! Resilience statistics
//!
//! Captures recovery activity for:
//! - Health/stats projections in the UI
//! - Field diagnostics (JSON export)
//! - Counting rotations, repairs and escalations per session

use crate::{
    recovery::{LocalRepair, RecoveryAction},
    types::{BackendKind, HealthStatus, SessionId, SessionState, SlotId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Default number of records kept in the log
const DEFAULT_CAPACITY: usize = 256;

/// Resilience event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatsEvent {
    /// New stream target loaded
    Load {
        url: String,
        backend: BackendKind,
        use_proxy: bool,
    },

    /// Session state change
    StateChange {
        from: SessionState,
        to: SessionState,
    },

    /// Health classification changed
    HealthChange {
        from: HealthStatus,
        to: HealthStatus,
    },

    /// Active slot switched
    Rotation {
        from: SlotId,
        to: SlotId,
        reactive: bool,
    },

    /// Incoming slot never became ready
    RotationAborted {
        slot: SlotId,
    },

    /// Same-sink repair applied
    LocalRepair {
        repair: LocalRepair,
    },

    /// Budgeted recovery scheduled
    RetryScheduled {
        attempt: u32,
        action: RecoveryAction,
        backoff_ms: u64,
    },

    /// Stream stable again after a failure episode
    Recovered,

    /// Back buffer trimmed
    Trim {
        keep_from: f64,
    },

    /// Callback from a torn-down instance dropped
    StaleCallback {
        slot: Option<SlotId>,
    },

    /// Retry budget exhausted
    Terminal {
        attempts: u32,
        reason: String,
    },
}

/// Stats event with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    #[serde(flatten)]
    pub event: StatsEvent,
}

/// Running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounters {
    pub rotations: u64,
    pub reactive_rotations: u64,
    pub aborted_rotations: u64,
    pub local_repairs: u64,
    pub retries: u64,
    pub recoveries: u64,
    pub escalations: u64,
    pub trims: u64,
    pub stale_callbacks: u64,
    pub terminal_failures: u64,
}

/// Bounded, sequence-numbered event log plus counters
#[derive(Debug)]
pub struct StatsRecorder {
    session_id: SessionId,
    sequence: u64,
    log: VecDeque<StatsRecord>,
    capacity: usize,
    counters: StatsCounters,
}

impl StatsRecorder {
    pub fn new(session_id: SessionId) -> Self {
        Self::with_capacity(session_id, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(session_id: SessionId, capacity: usize) -> Self {
        Self {
            session_id,
            sequence: 0,
            log: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
            counters: StatsCounters::default(),
        }
    }

    /// Start attributing records to a new session. Counters carry over.
    pub fn set_session(&mut self, session_id: SessionId) {
        self.session_id = session_id;
    }

    pub fn record(&mut self, event: StatsEvent) {
        match &event {
            StatsEvent::Rotation { reactive, .. } => {
                self.counters.rotations += 1;
                if *reactive {
                    self.counters.reactive_rotations += 1;
                }
            }
            StatsEvent::RotationAborted { .. } => self.counters.aborted_rotations += 1,
            StatsEvent::LocalRepair { .. } => self.counters.local_repairs += 1,
            StatsEvent::RetryScheduled { action, .. } => {
                self.counters.retries += 1;
                if matches!(
                    action,
                    RecoveryAction::UseProxy | RecoveryAction::SwitchBackend(_)
                ) {
                    self.counters.escalations += 1;
                }
            }
            StatsEvent::Recovered => self.counters.recoveries += 1,
            StatsEvent::Trim { .. } => self.counters.trims += 1,
            StatsEvent::StaleCallback { .. } => self.counters.stale_callbacks += 1,
            StatsEvent::Terminal { .. } => self.counters.terminal_failures += 1,
            StatsEvent::Load { .. } | StatsEvent::StateChange { .. } | StatsEvent::HealthChange { .. } => {}
        }

        self.sequence += 1;
        let record = StatsRecord {
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence: self.sequence,
            event,
        };
        debug!(sequence = record.sequence, event = ?record.event, "Stats event");

        if self.log.len() >= self.capacity {
            self.log.pop_front();
        }
        self.log.push_back(record);
    }

    pub fn counters(&self) -> StatsCounters {
        self.counters
    }

    pub fn records(&self) -> impl Iterator<Item = &StatsRecord> {
        self.log.iter()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    /// Export the retained log as a JSON array
    pub fn to_json(&self) -> crate::Result<String> {
        let records: Vec<&StatsRecord> = self.log.iter().collect();
        Ok(serde_json::to_string(&records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_events() {
        let mut stats = StatsRecorder::new(SessionId::new());
        stats.record(StatsEvent::Rotation {
            from: SlotId(0),
            to: SlotId(1),
            reactive: false,
        });
        stats.record(StatsEvent::Rotation {
            from: SlotId(1),
            to: SlotId(0),
            reactive: true,
        });
        stats.record(StatsEvent::RetryScheduled {
            attempt: 1,
            action: RecoveryAction::UseProxy,
            backoff_ms: 500,
        });
        stats.record(StatsEvent::StaleCallback { slot: Some(SlotId(1)) });

        let counters = stats.counters();
        assert_eq!(counters.rotations, 2);
        assert_eq!(counters.reactive_rotations, 1);
        assert_eq!(counters.retries, 1);
        assert_eq!(counters.escalations, 1);
        assert_eq!(counters.stale_callbacks, 1);
        assert_eq!(stats.len(), 4);
    }

    #[test]
    fn log_is_bounded_and_sequenced() {
        let mut stats = StatsRecorder::with_capacity(SessionId::new(), 3);
        for _ in 0..5 {
            stats.record(StatsEvent::Recovered);
        }
        let sequences: Vec<u64> = stats.records().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(stats.counters().recoveries, 5);
    }

    #[test]
    fn json_export_flattens_event_tag() {
        let mut stats = StatsRecorder::new(SessionId::new());
        stats.record(StatsEvent::Terminal {
            attempts: 6,
            reason: "network error: fragLoadError".into(),
        });
        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["event"], "terminal");
        assert_eq!(value[0]["attempts"], 6);
        assert_eq!(value[0]["sequence"], 1);
    }
}
