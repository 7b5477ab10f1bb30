//! Buffer rotation controller
//!
//! Owns N sink slots on one shared surface and keeps exactly one of them
//! Active. Backups warm up hidden and muted on a staggered schedule; a
//! rotation timer (and, reactively, stall detection) switches the active role
//! to a ready backup before the decode backend reaches its source-buffer
//! ceiling. The outgoing slot stays visible behind the incoming one for the
//! handoff window, is then muted, paused, hidden and torn down, and starts
//! warming again as the next candidate.
//!
//! ```text
//!            prewarm              ready + rotation
//!   Idle ───────────▶ Warming ─────────────────────▶ Active
//!    ▲                                                  │ switch
//!    │          teardown after handoff window           ▼
//!    └───────────────────────────────────────────── Retiring
//! ```
//!
//! Every slot-owned timer and backend event is stamped with the slot's
//! generation. Teardown cancels the slot's timers and bumps the generation,
//! so a late callback from a destroyed backend is recognised and dropped.

use crate::{
    backend::{
        BackendEvent, BackendEventKind, BackendEventSender, BackendEvents, BackendFactory,
        BackendHandle, BackendParams,
    },
    config::RotationConfig,
    error::BackendError,
    sink::{MediaSink, SinkSettings, SinkSnapshot},
    timer::{FiredTimer, TimerKind, TimerOwner, TimerQueue},
    types::{BackendKind, Generation, SlotId, SlotState, Visibility},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// What every new backend instance should load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub kind: BackendKind,
    pub url: Url,
    pub params: BackendParams,
}

/// One rendering target and the backend currently bound to it
pub struct SinkSlot {
    id: SlotId,
    state: SlotState,
    generation: Generation,
    sink: Box<dyn MediaSink>,
    backend: Option<BackendHandle>,
    ready: bool,
    last_known_position: f64,
    visibility: Visibility,
    resume_at: Option<f64>,
}

impl SinkSlot {
    fn new(id: SlotId, sink: Box<dyn MediaSink>) -> Self {
        Self {
            id,
            state: SlotState::Idle,
            generation: Generation::default(),
            sink,
            backend: None,
            ready: false,
            last_known_position: 0.0,
            visibility: Visibility::HIDDEN,
            resume_at: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// First decodable data confirmed for the current backend
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Cursor recorded when the slot last left the Active role
    pub fn last_known_position(&self) -> f64 {
        self.last_known_position
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    pub fn has_live_backend(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| !b.is_destroyed())
    }

    fn show(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.sink.set_visibility(visibility);
    }

    fn apply(&mut self, settings: &SinkSettings, audible: bool) {
        self.sink.set_volume(settings.volume);
        self.sink.set_playback_rate(settings.playback_rate);
        self.sink.set_muted(settings.muted || !audible);
    }

    /// Destroy the backend and invalidate everything stamped with the old generation
    fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.teardown();
        }
        self.generation = self.generation.next();
        self.state = SlotState::Idle;
        self.ready = false;
        self.resume_at = None;
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSlot")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("ready", &self.ready)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Result of feeding an event or timer to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum RotationOutcome {
    /// Nothing for the session to act on
    Nothing,
    /// Callback from a torn-down instance was dropped
    Stale { slot: Option<SlotId> },
    /// Active slot confirmed first decodable data
    ActiveReady { slot: SlotId },
    /// Active slot failed
    ActiveFailed(BackendError),
    /// Active slot never became ready
    ActiveLoadTimeout { slot: SlotId },
    /// Rotation is waiting for the incoming slot
    Pending { slot: SlotId },
    /// Active role moved to another slot
    Switched { from: SlotId, to: SlotId, reactive: bool },
    /// Outgoing slot torn down and warming again
    HandoffComplete { slot: SlotId },
    /// Incoming slot failed or timed out; rotation abandoned
    Aborted { slot: SlotId },
    /// Reactive rotation requested but no backup is ready
    NoReadyBackup,
}

/// Rotation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationStats {
    pub rotations: u64,
    pub reactive_rotations: u64,
    pub aborted_rotations: u64,
    pub recycled_backups: u64,
}

/// N-slot rotator
pub struct RotationController {
    config: RotationConfig,
    slots: Vec<SinkSlot>,
    active: SlotId,
    incoming: Option<SlotId>,
    /// Stamp for the rotation timer; bumped on full teardown
    epoch: Generation,
    /// Prewarm and rotation schedules started for the current active load
    armed: bool,
    paused: bool,
    settings: SinkSettings,
    factory: Box<dyn BackendFactory>,
    events: BackendEventSender,
    plan: Option<LoadPlan>,
    stats: RotationStats,
}

impl RotationController {
    pub fn new(
        config: RotationConfig,
        sinks: Vec<Box<dyn MediaSink>>,
        factory: Box<dyn BackendFactory>,
        events: BackendEventSender,
    ) -> Self {
        let slots = sinks
            .into_iter()
            .enumerate()
            .map(|(index, sink)| SinkSlot::new(SlotId(index), sink))
            .collect();
        let mut controller = Self {
            config,
            slots,
            active: SlotId(0),
            incoming: None,
            epoch: Generation::default(),
            armed: false,
            paused: false,
            settings: SinkSettings::default(),
            factory,
            events,
            plan: None,
            stats: RotationStats::default(),
        };
        controller.apply_settings(SinkSettings::default());
        for slot in &mut controller.slots {
            slot.show(Visibility::HIDDEN);
        }
        controller
    }

    /// Rotation needs at least one backup
    pub fn is_enabled(&self) -> bool {
        self.slots.len() > 1
    }

    pub fn set_plan(&mut self, plan: LoadPlan) {
        self.plan = Some(plan);
    }

    pub fn plan(&self) -> Option<&LoadPlan> {
        self.plan.as_ref()
    }

    pub fn active(&self) -> SlotId {
        self.active
    }

    pub fn active_slot(&self) -> &SinkSlot {
        &self.slots[self.active.0]
    }

    pub fn slots(&self) -> &[SinkSlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&SinkSlot> {
        self.slots.get(id.0)
    }

    pub fn incoming(&self) -> Option<SlotId> {
        self.incoming
    }

    pub fn is_active_ready(&self) -> bool {
        let slot = self.active_slot();
        slot.state == SlotState::Active && slot.ready
    }

    pub fn active_snapshot(&self) -> SinkSnapshot {
        self.active_slot().sink.snapshot()
    }

    pub fn has_ready_backup(&self) -> bool {
        self.ready_backup().is_some()
    }

    /// Backend instances currently alive across all slots
    pub fn live_handles(&self) -> usize {
        self.slots.iter().filter(|s| s.has_live_backend()).count()
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Active)
            .count()
    }

    pub fn slot_states(&self) -> Vec<SlotState> {
        self.slots.iter().map(|s| s.state).collect()
    }

    pub fn stats(&self) -> RotationStats {
        self.stats
    }

    /// Fresh start: every slot torn down, slot 0 Active and loading
    pub fn start(&mut self, timers: &mut TimerQueue, now: Instant) -> Result<()> {
        self.teardown_all(timers);
        self.active = SlotId(0);
        self.activate(timers, now, None)
    }

    /// Full teardown and recreate on the current active slot.
    ///
    /// With `resume` the new backend seeks back to the old cursor once ready.
    pub fn restart(&mut self, timers: &mut TimerQueue, now: Instant, resume: bool) -> Result<()> {
        let active = self.active;
        let position = resume.then(|| self.active_snapshot().position);
        self.teardown_all(timers);
        self.active = active;
        self.activate(timers, now, position)
    }

    /// Replace the active slot's backend in place, keeping the cursor.
    /// Backups are left alone.
    pub fn reload_active(&mut self, timers: &mut TimerQueue, now: Instant) -> Result<()> {
        let id = self.active;
        timers.cancel_owner(TimerOwner::Slot(id));
        let slot = &mut self.slots[id.0];
        let position = slot.sink.snapshot().position;
        if let Some(mut backend) = slot.backend.take() {
            backend.teardown();
        }
        slot.generation = slot.generation.next();
        slot.ready = false;
        slot.resume_at = Some(position);
        info!(slot = %id, generation = %slot.generation, position = position, "Reloading active slot in place");

        self.load_slot(id, timers, now)?;
        if !self.paused {
            self.slots[id.0].sink.play();
        }
        Ok(())
    }

    /// Tear every slot down and cancel every rotation timer
    pub fn teardown_all(&mut self, timers: &mut TimerQueue) {
        self.epoch = self.epoch.next();
        timers.cancel_kind(TimerOwner::Session, TimerKind::Rotation);
        let ids: Vec<SlotId> = self.slots.iter().map(|s| s.id).collect();
        for id in ids {
            self.recycle(id, timers);
        }
        self.incoming = None;
        self.armed = false;
    }

    fn activate(&mut self, timers: &mut TimerQueue, now: Instant, resume: Option<f64>) -> Result<()> {
        let id = self.active;
        let settings = self.settings;
        {
            let slot = &mut self.slots[id.0];
            slot.state = SlotState::Active;
            slot.resume_at = resume;
            slot.show(Visibility::FOREGROUND);
            slot.apply(&settings, true);
        }
        self.load_slot(id, timers, now)?;

        let slot = &mut self.slots[id.0];
        if !self.paused {
            slot.sink.play();
        }
        info!(slot = %id, generation = %slot.generation, "Active slot loading");
        Ok(())
    }

    fn load_slot(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> Result<()> {
        let plan = self.plan.as_ref().ok_or(Error::NoTarget)?;
        let slot = &mut self.slots[id.0];
        slot.ready = false;

        // Armed before the fallible calls: a load that fails outright still times out
        timers.reschedule(
            TimerOwner::Slot(id),
            slot.generation,
            TimerKind::ReadyTimeout,
            now + self.config.ready_timeout,
        );

        let events = BackendEvents::new(id, slot.generation, self.events.clone());
        let backend = self.factory.create(plan.kind, &plan.params, events)?;
        let mut handle = BackendHandle::new(id, slot.generation, backend);
        handle.attach(&slot.sink.handle())?;
        handle.load(&plan.url)?;

        slot.backend = Some(handle);
        Ok(())
    }

    /// Cancel the slot's timers, silence and hide it, destroy its backend
    fn recycle(&mut self, id: SlotId, timers: &mut TimerQueue) {
        timers.cancel_owner(TimerOwner::Slot(id));
        let slot = &mut self.slots[id.0];
        if slot.state == SlotState::Active || slot.state == SlotState::Retiring {
            slot.last_known_position = slot.sink.snapshot().position;
        }
        slot.sink.set_muted(true);
        slot.sink.pause();
        slot.show(Visibility::HIDDEN);
        slot.release();
    }

    fn schedule_prewarm(&self, id: SlotId, timers: &mut TimerQueue, at: Instant) {
        let generation = self.slots[id.0].generation;
        timers.reschedule(TimerOwner::Slot(id), generation, TimerKind::Prewarm, at);
    }

    fn schedule_rotation(&self, timers: &mut TimerQueue, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        timers.reschedule(
            TimerOwner::Session,
            self.epoch,
            TimerKind::Rotation,
            now + self.config.rotation_interval,
        );
    }

    /// Start the staggered warm-up of every backup and the rotation schedule
    fn arm(&mut self, timers: &mut TimerQueue, now: Instant) {
        self.armed = true;
        if !self.is_enabled() {
            return;
        }
        let count = self.slots.len();
        for k in 1..count {
            let id = SlotId((self.active.0 + k) % count);
            if self.slots[id.0].state == SlotState::Idle {
                self.schedule_prewarm(id, timers, now + self.config.prewarm_stagger * k as u32);
            }
        }
        self.schedule_rotation(timers, now);
        debug!(backups = count - 1, "Rotation armed");
    }

    /// Bring an Idle backup up hidden and muted
    fn warm(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> Result<()> {
        if self.slots[id.0].state != SlotState::Idle {
            return Ok(());
        }
        timers.cancel_kind(TimerOwner::Slot(id), TimerKind::Prewarm);
        let settings = self.settings;
        {
            let slot = &mut self.slots[id.0];
            slot.show(Visibility::HIDDEN);
            slot.apply(&settings, false);
        }

        match self.load_slot(id, timers, now) {
            Ok(()) => {
                let slot = &mut self.slots[id.0];
                slot.state = SlotState::Warming;
                slot.sink.play();
                debug!(slot = %id, generation = %slot.generation, "Warming backup");
                Ok(())
            }
            Err(e) => {
                warn!(slot = %id, error = %e, "Backup warm-up failed");
                self.recycle(id, timers);
                self.schedule_prewarm(id, timers, now + self.config.prewarm_stagger);
                Err(e)
            }
        }
    }

    /// Route a backend event to its slot
    pub fn on_event(&mut self, event: BackendEvent, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        let Some(slot) = self.slots.get(event.slot.0) else {
            return RotationOutcome::Stale { slot: None };
        };
        if slot.generation != event.generation || slot.backend.is_none() {
            warn!(
                slot = %event.slot,
                generation = %event.generation,
                current = %slot.generation,
                "Dropping stale backend event"
            );
            return RotationOutcome::Stale {
                slot: Some(event.slot),
            };
        }

        match event.kind {
            BackendEventKind::Metadata => {
                debug!(slot = %event.slot, "Backend metadata");
                RotationOutcome::Nothing
            }
            BackendEventKind::Ready => self.on_ready(event.slot, timers, now),
            BackendEventKind::Error(error) => self.on_backend_error(event.slot, error, timers, now),
        }
    }

    fn on_ready(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        let slot = &mut self.slots[id.0];
        if slot.ready {
            return RotationOutcome::Nothing;
        }
        slot.ready = true;
        timers.cancel_kind(TimerOwner::Slot(id), TimerKind::ReadyTimeout);
        if let Some(position) = slot.resume_at.take() {
            slot.sink.seek(position);
        }

        let (state, generation) = (slot.state, slot.generation);
        match state {
            SlotState::Active => {
                info!(slot = %id, generation = %generation, "Active slot ready");
                if !self.armed {
                    self.arm(timers, now);
                }
                RotationOutcome::ActiveReady { slot: id }
            }
            SlotState::Warming => {
                debug!(slot = %id, "Backup ready");
                if self.incoming == Some(id) {
                    self.switch_to(id, false, timers, now)
                } else {
                    RotationOutcome::Nothing
                }
            }
            SlotState::Idle | SlotState::Retiring => RotationOutcome::Nothing,
        }
    }

    fn on_backend_error(
        &mut self,
        id: SlotId,
        error: BackendError,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> RotationOutcome {
        let state = self.slots[id.0].state;
        match state {
            SlotState::Active => {
                warn!(slot = %id, error = %error, "Active backend error");
                RotationOutcome::ActiveFailed(error)
            }
            SlotState::Warming => {
                warn!(slot = %id, error = %error, "Backup backend error, recycling");
                self.recycle_backup(id, timers, now)
            }
            SlotState::Idle | SlotState::Retiring => {
                debug!(slot = %id, error = %error, "Ignoring error from outgoing slot");
                RotationOutcome::Nothing
            }
        }
    }

    /// Recycle a failed or late backup and retry its warm-up after one stagger
    fn recycle_backup(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        let was_incoming = self.incoming == Some(id);
        self.recycle(id, timers);
        self.schedule_prewarm(id, timers, now + self.config.prewarm_stagger);
        self.stats.recycled_backups += 1;
        if was_incoming {
            self.abort_incoming(id, timers, now)
        } else {
            RotationOutcome::Nothing
        }
    }

    fn abort_incoming(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        self.incoming = None;
        self.stats.aborted_rotations += 1;
        self.schedule_rotation(timers, now);
        warn!(slot = %id, "Rotation aborted, incoming slot not ready");
        RotationOutcome::Aborted { slot: id }
    }

    /// Handle a fired Rotation timer or any slot-owned timer
    pub fn on_timer(&mut self, fired: FiredTimer, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        match fired.owner {
            TimerOwner::Session if fired.kind == TimerKind::Rotation => {
                if fired.generation != self.epoch {
                    return RotationOutcome::Stale { slot: None };
                }
                self.begin_rotation(false, timers, now)
            }
            TimerOwner::Session => RotationOutcome::Nothing,
            TimerOwner::Slot(id) => {
                let Some(slot) = self.slots.get(id.0) else {
                    return RotationOutcome::Stale { slot: None };
                };
                if slot.generation != fired.generation {
                    warn!(slot = %id, kind = ?fired.kind, "Dropping stale slot timer");
                    return RotationOutcome::Stale { slot: Some(id) };
                }
                match fired.kind {
                    TimerKind::Prewarm => {
                        if let Err(e) = self.warm(id, timers, now) {
                            debug!(slot = %id, error = %e, "Prewarm deferred");
                        }
                        RotationOutcome::Nothing
                    }
                    TimerKind::ReadyTimeout => self.on_ready_timeout(id, timers, now),
                    TimerKind::Handoff => self.complete_handoff(id, timers, now),
                    _ => RotationOutcome::Nothing,
                }
            }
        }
    }

    fn on_ready_timeout(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        let slot = &self.slots[id.0];
        if slot.ready {
            return RotationOutcome::Nothing;
        }
        let state = slot.state;
        match state {
            SlotState::Active => {
                warn!(slot = %id, "Active slot did not become ready in time");
                RotationOutcome::ActiveLoadTimeout { slot: id }
            }
            SlotState::Warming => {
                warn!(slot = %id, "Backup did not become ready in time");
                self.recycle_backup(id, timers, now)
            }
            SlotState::Idle | SlotState::Retiring => RotationOutcome::Nothing,
        }
    }

    /// Start a rotation.
    ///
    /// A scheduled rotation picks the next slot round-robin and waits for it
    /// if needed. A reactive rotation only ever switches to a backup that is
    /// already ready; otherwise it reports [`RotationOutcome::NoReadyBackup`].
    pub fn begin_rotation(&mut self, reactive: bool, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        if !self.is_enabled() {
            return if reactive {
                RotationOutcome::NoReadyBackup
            } else {
                RotationOutcome::Nothing
            };
        }

        if reactive {
            return match self.ready_backup() {
                Some(id) => {
                    self.incoming = None;
                    self.switch_to(id, true, timers, now)
                }
                None => RotationOutcome::NoReadyBackup,
            };
        }

        if let Some(pending) = self.incoming {
            debug!(slot = %pending, "Rotation already pending");
            return RotationOutcome::Nothing;
        }
        if !self.is_active_ready() {
            self.schedule_rotation(timers, now);
            return RotationOutcome::Nothing;
        }
        let Some(candidate) = self.next_candidate() else {
            self.schedule_rotation(timers, now);
            return RotationOutcome::Nothing;
        };

        let slot = &self.slots[candidate.0];
        match (slot.state, slot.ready) {
            (SlotState::Warming, true) => self.switch_to(candidate, false, timers, now),
            (SlotState::Warming, false) => {
                self.incoming = Some(candidate);
                timers.reschedule(
                    TimerOwner::Slot(candidate),
                    slot.generation,
                    TimerKind::ReadyTimeout,
                    now + self.config.ready_timeout,
                );
                debug!(slot = %candidate, "Waiting for incoming slot");
                RotationOutcome::Pending { slot: candidate }
            }
            (SlotState::Idle, _) => {
                self.incoming = Some(candidate);
                match self.warm(candidate, timers, now) {
                    Ok(()) => RotationOutcome::Pending { slot: candidate },
                    Err(_) => self.abort_incoming(candidate, timers, now),
                }
            }
            _ => RotationOutcome::Nothing,
        }
    }

    fn next_candidate(&self) -> Option<SlotId> {
        let count = self.slots.len();
        (1..count)
            .map(|k| SlotId((self.active.0 + k) % count))
            .find(|id| matches!(self.slots[id.0].state, SlotState::Warming | SlotState::Idle))
    }

    fn ready_backup(&self) -> Option<SlotId> {
        let count = self.slots.len();
        (1..count)
            .map(|k| SlotId((self.active.0 + k) % count))
            .find(|id| {
                let slot = &self.slots[id.0];
                slot.state == SlotState::Warming && slot.ready
            })
    }

    fn switch_to(&mut self, incoming: SlotId, reactive: bool, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        let from = self.active;
        {
            let outgoing = &mut self.slots[from.0];
            outgoing.last_known_position = outgoing.sink.snapshot().position;
            outgoing.state = SlotState::Retiring;
            outgoing.show(Visibility::BACKGROUND);
            timers.cancel_kind(TimerOwner::Slot(from), TimerKind::ReadyTimeout);
            timers.reschedule(
                TimerOwner::Slot(from),
                outgoing.generation,
                TimerKind::Handoff,
                now + self.config.handoff_window,
            );
        }

        let settings = self.settings;
        {
            let slot = &mut self.slots[incoming.0];
            slot.state = SlotState::Active;
            slot.show(Visibility::FOREGROUND);
            slot.apply(&settings, true);
            if self.paused {
                slot.sink.pause();
            } else {
                slot.sink.play();
            }
        }

        self.active = incoming;
        self.incoming = None;
        self.schedule_rotation(timers, now);
        self.stats.rotations += 1;
        if reactive {
            self.stats.reactive_rotations += 1;
        }
        info!(from = %from, to = %incoming, reactive, "Rotated active slot");
        RotationOutcome::Switched {
            from,
            to: incoming,
            reactive,
        }
    }

    /// End of the handoff window: silence, stop and destroy the outgoing
    /// slot, then warm it again for the next rotation
    fn complete_handoff(&mut self, id: SlotId, timers: &mut TimerQueue, now: Instant) -> RotationOutcome {
        if self.slots[id.0].state != SlotState::Retiring {
            return RotationOutcome::Nothing;
        }
        self.recycle(id, timers);
        debug!(slot = %id, "Handoff complete");
        if let Err(e) = self.warm(id, timers, now) {
            debug!(slot = %id, error = %e, "Re-warm deferred");
        }
        RotationOutcome::HandoffComplete { slot: id }
    }

    /// Jump the active cursor forward
    pub fn seek_nudge(&mut self, offset_secs: f64) {
        let slot = &mut self.slots[self.active.0];
        let position = slot.sink.snapshot().position;
        debug!(slot = %slot.id, from = position, offset = offset_secs, "Seek nudge");
        slot.sink.seek(position + offset_secs);
    }

    pub fn trim_active(&mut self, keep_from: f64) {
        let slot = &mut self.slots[self.active.0];
        slot.sink.trim_back_buffer(keep_from);
    }

    /// Apply user intent to every sink; backups stay muted
    pub fn apply_settings(&mut self, settings: SinkSettings) {
        self.settings = settings;
        for slot in &mut self.slots {
            match slot.state {
                SlotState::Active => slot.apply(&settings, true),
                SlotState::Retiring => {
                    slot.sink.set_volume(settings.volume);
                    slot.sink.set_playback_rate(settings.playback_rate);
                    if settings.muted {
                        slot.sink.set_muted(true);
                    }
                }
                SlotState::Idle | SlotState::Warming => slot.apply(&settings, false),
            }
        }
    }

    pub fn settings(&self) -> SinkSettings {
        self.settings
    }

    pub fn play(&mut self) {
        self.paused = false;
        self.slots[self.active.0].sink.play();
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.slots[self.active.0].sink.pause();
    }
}
