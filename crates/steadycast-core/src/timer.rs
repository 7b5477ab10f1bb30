//! Generation-stamped timer queue
//!
//! Every logical timer (health tick, rotation, retry backoff, staggered
//! warm-up, ready timeout, handoff) is an entry here, owned by the session or
//! by one slot and stamped with the owner's generation at scheduling time.
//! Teardown cancels an owner's timers in one call; anything that still fires
//! with an outdated stamp is rejected by the caller's generation check.
//!
//! Due timers fire in deadline order; equal deadlines fire in scheduling
//! order.

use crate::types::{Generation, SlotId};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::trace;

/// Record that owns a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Session,
    Slot(SlotId),
}

impl std::fmt::Display for TimerOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerOwner::Session => write!(f, "session"),
            TimerOwner::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

/// Logical timer purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    HealthTick,
    Rotation,
    RetryBackoff,
    Prewarm,
    ReadyTimeout,
    Handoff,
}

/// Opaque timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// A timer that reached its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub owner: TimerOwner,
    pub kind: TimerKind,
    pub generation: Generation,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    owner: TimerOwner,
    kind: TimerKind,
    generation: Generation,
}

/// Deadline-ordered set of cancellable timers
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(Instant, TimerId), Scheduled>,
    deadlines: HashMap<TimerId, Instant>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer
    pub fn schedule(
        &mut self,
        owner: TimerOwner,
        generation: Generation,
        kind: TimerKind,
        deadline: Instant,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            (deadline, id),
            Scheduled {
                owner,
                kind,
                generation,
            },
        );
        self.deadlines.insert(id, deadline);
        trace!(?owner, ?kind, %generation, "Timer scheduled");
        id
    }

    /// Replace any pending timer of the same owner and kind
    pub fn reschedule(
        &mut self,
        owner: TimerOwner,
        generation: Generation,
        kind: TimerKind,
        deadline: Instant,
    ) -> TimerId {
        self.cancel_kind(owner, kind);
        self.schedule(owner, generation, kind, deadline)
    }

    /// Cancel a single timer; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.entries.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancel every timer of one kind held by an owner
    pub fn cancel_kind(&mut self, owner: TimerOwner, kind: TimerKind) -> usize {
        self.cancel_where(|s| s.owner == owner && s.kind == kind)
    }

    /// Cancel every timer held by an owner
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        self.cancel_where(|s| s.owner == owner)
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.deadlines.clear();
    }

    fn cancel_where(&mut self, predicate: impl Fn(&Scheduled) -> bool) -> usize {
        let doomed: Vec<(Instant, TimerId)> = self
            .entries
            .iter()
            .filter(|(_, s)| predicate(s))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.entries.remove(key);
            self.deadlines.remove(&key.1);
        }
        doomed.len()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<FiredTimer> {
        let (&(deadline, id), _) = self.entries.iter().next()?;
        if deadline > now {
            return None;
        }
        let scheduled = self.entries.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some(FiredTimer {
            id,
            owner: scheduled.owner,
            kind: scheduled.kind,
            generation: scheduled.generation,
            deadline,
        })
    }

    /// Whether an owner holds a pending timer of this kind
    pub fn is_pending(&self, owner: TimerOwner, kind: TimerKind) -> bool {
        self.entries
            .values()
            .any(|s| s.owner == owner && s.kind == kind)
    }

    /// Number of timers held by an owner
    pub fn count_owned(&self, owner: TimerOwner) -> usize {
        self.entries.values().filter(|s| s.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
