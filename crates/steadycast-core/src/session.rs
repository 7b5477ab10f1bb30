//! Playback Session - orchestrator for one live channel
//!
//! Coordinates:
//! - Stream target resolution and proxy/backend escalation
//! - Health ticks and local repairs
//! - Recovery scheduling with bounded backoff
//! - Buffer rotation across the sink slots
//! - Read projections for the UI
//!
//! The session is a synchronous state machine. Time only moves through
//! [`PlaybackSession::advance`], which drains backend events and fires due
//! timers; the [`driver`](crate::driver) runs it against the tokio clock.

use crate::{
    backend::{
        event_channel, BackendEvent, BackendEventReceiver, BackendEventSender, BackendFactory,
        BackendParams,
    },
    buffer::TrimPolicy,
    config::ResilienceConfig,
    error::BackendError,
    health::HealthMonitor,
    recovery::{Directive, EscalationContext, FailureCause, LocalRepair, RecoveryAction, RecoveryPolicy, RecoveryState},
    resolver::UrlResolver,
    rotation::{LoadPlan, RotationController, RotationOutcome},
    sink::{MediaSink, SinkProvider, SinkSettings},
    stats::{StatsCounters, StatsEvent, StatsRecorder},
    timer::{FiredTimer, TimerKind, TimerOwner, TimerQueue},
    types::{
        BackendKind, Generation, HealthStatus, QualityTier, SessionId, SessionState, SlotId,
        SlotState, StreamTarget,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Slowest and fastest playback rates accepted from the UI
const MIN_PLAYBACK_RATE: f32 = 0.25;
const MAX_PLAYBACK_RATE: f32 = 4.0;

/// Read-only projection for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: SessionState,
    pub backend_kind: Option<BackendKind>,
    pub use_proxy: bool,
    pub health: HealthStatus,
    pub retry_count: u32,
    pub recovery: RecoveryState,
    pub next_backoff_ms: u64,
    pub buffered_ahead_secs: f64,
    pub active_slot: SlotId,
    pub slot_states: Vec<SlotState>,
    pub rotation_count: u64,
    pub quality: QualityTier,
    pub volume: f32,
    pub muted: bool,
    pub playing: bool,
    pub terminal_reason: Option<String>,
}

/// Live playback session over N sink slots
pub struct PlaybackSession {
    /// Unique session ID, renewed on every new target
    id: SessionId,
    config: ResilienceConfig,
    state: SessionState,
    /// Stamp for session-owned timers; bumped on every teardown
    generation: Generation,
    timers: TimerQueue,
    rotation: RotationController,
    health: HealthMonitor,
    recovery: RecoveryPolicy,
    resolver: UrlResolver,
    trim: TrimPolicy,
    target: Option<StreamTarget>,
    tier: QualityTier,
    settings: SinkSettings,
    /// User intent
    playing: bool,
    /// Recovery action waiting for its backoff timer
    pending_action: Option<RecoveryAction>,
    health_status: HealthStatus,
    terminal_reason: Option<String>,
    events_tx: BackendEventSender,
    events_rx: Option<BackendEventReceiver>,
    stats: StatsRecorder,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl PlaybackSession {
    /// Create a session with one sink per configured slot
    pub fn new(
        config: ResilienceConfig,
        factory: Box<dyn BackendFactory>,
        sinks: &mut dyn SinkProvider,
    ) -> Result<Self> {
        config.validate()?;

        let (events_tx, events_rx) = event_channel();
        let slot_sinks: Vec<Box<dyn MediaSink>> = (0..config.rotation.slot_count)
            .map(|index| sinks.create_sink(SlotId(index)))
            .collect();
        let rotation = RotationController::new(
            config.rotation.clone(),
            slot_sinks,
            factory,
            events_tx.clone(),
        );

        let id = SessionId::new();
        let session = Self {
            id,
            state: SessionState::Idle,
            generation: Generation::default(),
            timers: TimerQueue::new(),
            rotation,
            health: HealthMonitor::new(config.health.clone()),
            recovery: RecoveryPolicy::new(config.retry.clone()),
            resolver: UrlResolver::new(&config.proxy),
            trim: TrimPolicy::new(config.trim.clone()),
            target: None,
            tier: QualityTier::default(),
            settings: SinkSettings::default(),
            playing: true,
            pending_action: None,
            health_status: HealthStatus::Healthy,
            terminal_reason: None,
            events_tx,
            events_rx: Some(events_rx),
            stats: StatsRecorder::new(id),
            snapshot_tx: watch::channel(Self::empty_snapshot(id)).0,
            config,
        };
        session.publish();
        Ok(session)
    }

    /// Deterministic backoff jitter
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.recovery = RecoveryPolicy::with_seed(self.config.retry.clone(), seed);
        self
    }

    fn empty_snapshot(id: SessionId) -> SessionSnapshot {
        SessionSnapshot {
            session_id: id,
            state: SessionState::Idle,
            backend_kind: None,
            use_proxy: false,
            health: HealthStatus::Healthy,
            retry_count: 0,
            recovery: RecoveryState::Stable,
            next_backoff_ms: 0,
            buffered_ahead_secs: 0.0,
            active_slot: SlotId(0),
            slot_states: Vec::new(),
            rotation_count: 0,
            quality: QualityTier::default(),
            volume: 1.0,
            muted: false,
            playing: true,
            terminal_reason: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn target(&self) -> Option<&StreamTarget> {
        self.target.as_ref()
    }

    pub fn rotation(&self) -> &RotationController {
        &self.rotation
    }

    pub fn recovery(&self) -> &RecoveryPolicy {
        &self.recovery
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    pub fn counters(&self) -> StatsCounters {
        self.stats.counters()
    }

    pub fn pending_action(&self) -> Option<RecoveryAction> {
        self.pending_action
    }

    /// Earliest pending timer; the driver sleeps until then
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Hand the backend event receiver to an external loop.
    ///
    /// Once taken, [`PlaybackSession::advance`] no longer drains events and
    /// the owner must feed them through [`PlaybackSession::handle_backend_event`].
    pub fn take_event_receiver(&mut self) -> Option<BackendEventReceiver> {
        self.events_rx.take()
    }

    /// Sender backends report through; exposed for adapters that emit outside a factory
    pub fn event_sender(&self) -> BackendEventSender {
        self.events_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current projection
    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.rotation.active_slot();
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            backend_kind: self.target.as_ref().map(|t| t.backend_kind),
            use_proxy: self.target.as_ref().is_some_and(|t| t.use_proxy),
            health: self.health_status,
            retry_count: self.recovery.attempts(),
            recovery: self.recovery.state(),
            next_backoff_ms: self.recovery.last_backoff().as_millis() as u64,
            buffered_ahead_secs: self
                .health
                .last_sample()
                .map(|s| s.buffered_ahead_secs)
                .unwrap_or(0.0),
            active_slot: active.id(),
            slot_states: self.rotation.slot_states(),
            rotation_count: self.rotation.stats().rotations,
            quality: self.tier,
            volume: self.settings.volume,
            muted: self.settings.muted,
            playing: self.playing,
            terminal_reason: self.terminal_reason.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    /// Transition to new state
    fn set_state(&mut self, new_state: SessionState) -> Result<()> {
        let current = self.state;
        if current == new_state {
            return Ok(());
        }
        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }
        self.state = new_state;
        self.stats.record(StatsEvent::StateChange {
            from: current,
            to: new_state,
        });
        info!(from = %current, to = %new_state, session_id = %self.id, "State transition");
        Ok(())
    }

    fn playing_state(&self) -> SessionState {
        if self.target.as_ref().is_some_and(|t| t.use_proxy) {
            SessionState::PlayingProxied
        } else {
            SessionState::PlayingDirect
        }
    }

    fn plan(&self) -> Result<LoadPlan> {
        let target = self.target.as_ref().ok_or(Error::NoTarget)?;
        Ok(LoadPlan {
            kind: target.backend_kind,
            url: self.resolver.effective_url(target)?,
            params: BackendParams::for_tier(self.tier),
        })
    }

    /// Drop every slot, timer and pending action of the current target
    fn teardown(&mut self) {
        self.rotation.teardown_all(&mut self.timers);
        self.timers.clear();
        self.generation = self.generation.next();
        self.pending_action = None;
        self.health.reset();
        self.trim.reset();
        self.health_status = HealthStatus::Healthy;
    }

    fn prepare_target(&mut self, url: &str) -> Result<()> {
        let raw_url = Url::parse(url)?;
        self.teardown();
        self.set_state(SessionState::Idle)?;

        self.id = SessionId::new();
        self.stats.set_session(self.id);
        self.recovery.reset();
        self.terminal_reason = None;

        let target = self.resolver.initial_target(raw_url);
        info!(
            url = %target.raw_url,
            backend = %target.backend_kind,
            use_proxy = target.use_proxy,
            session_id = %self.id,
            "Loading stream target"
        );
        self.stats.record(StatsEvent::Load {
            url: target.raw_url.to_string(),
            backend: target.backend_kind,
            use_proxy: target.use_proxy,
        });
        self.target = Some(target);
        Ok(())
    }

    /// Load a new target and start playing immediately
    #[instrument(skip(self, now))]
    pub fn load(&mut self, url: &str, now: Instant) -> Result<()> {
        self.prepare_target(url)?;
        self.set_state(SessionState::Initializing)?;
        let result = self.start_playback(now);
        self.publish();
        result
    }

    /// Load a new target but hold it until [`PlaybackSession::release_gate`]
    #[instrument(skip(self))]
    pub fn load_gated(&mut self, url: &str) -> Result<()> {
        self.prepare_target(url)?;
        self.set_state(SessionState::AwaitingGate)?;
        self.publish();
        Ok(())
    }

    /// Start a gated target once the external precondition is met
    #[instrument(skip(self, now))]
    pub fn release_gate(&mut self, now: Instant) -> Result<()> {
        if self.state != SessionState::AwaitingGate {
            debug!(state = %self.state, "No gate pending");
            return Ok(());
        }
        self.set_state(SessionState::Initializing)?;
        let result = self.start_playback(now);
        self.publish();
        result
    }

    fn start_playback(&mut self, now: Instant) -> Result<()> {
        let plan = self.plan()?;
        self.rotation.set_plan(plan);
        self.rotation.apply_settings(self.settings);
        let result = self.rotation.start(&mut self.timers, now);
        if !self.playing {
            self.rotation.pause();
        }
        self.timers.schedule(
            TimerOwner::Session,
            self.generation,
            TimerKind::HealthTick,
            now + self.config.health.tick_interval,
        );
        self.absorb(result, now)
    }

    /// Route backend failures from a load into recovery; everything else propagates
    fn absorb(&mut self, result: Result<()>, now: Instant) -> Result<()> {
        match result {
            Err(Error::Backend(error)) => self.handle_failure(FailureCause::Backend(error), now),
            other => other,
        }
    }

    /// Drain backend events and fire every timer due at `now`
    pub fn advance(&mut self, now: Instant) -> Result<()> {
        loop {
            self.drain_events(now)?;
            match self.timers.pop_due(now) {
                Some(fired) => self.on_timer(fired)?,
                None => break,
            }
        }
        self.publish();
        Ok(())
    }

    fn drain_events(&mut self, now: Instant) -> Result<()> {
        let Some(mut rx) = self.events_rx.take() else {
            return Ok(());
        };
        let mut result = Ok(());
        while let Ok(event) = rx.try_recv() {
            result = self.dispatch_event(event, now);
            if result.is_err() {
                break;
            }
        }
        self.events_rx = Some(rx);
        result
    }

    /// Feed one backend event
    pub fn handle_backend_event(&mut self, event: BackendEvent, now: Instant) -> Result<()> {
        let result = self.dispatch_event(event, now);
        self.publish();
        result
    }

    fn dispatch_event(&mut self, event: BackendEvent, now: Instant) -> Result<()> {
        if !self.state.is_live() {
            debug!(slot = %event.slot, state = %self.state, "Backend event while not live");
            self.stats.record(StatsEvent::StaleCallback {
                slot: Some(event.slot),
            });
            return Ok(());
        }
        let outcome = self.rotation.on_event(event, &mut self.timers, now);
        self.apply_outcome(outcome, now)
    }

    fn on_timer(&mut self, fired: FiredTimer) -> Result<()> {
        let now = fired.deadline;
        match (fired.owner, fired.kind) {
            (TimerOwner::Session, TimerKind::HealthTick | TimerKind::RetryBackoff)
                if fired.generation != self.generation =>
            {
                warn!(kind = ?fired.kind, generation = %fired.generation, "Dropping stale session timer");
                self.stats.record(StatsEvent::StaleCallback { slot: None });
                Ok(())
            }
            (TimerOwner::Session, TimerKind::HealthTick) => self.health_tick(now),
            (TimerOwner::Session, TimerKind::RetryBackoff) => self.execute_pending(now),
            _ => {
                let outcome = self.rotation.on_timer(fired, &mut self.timers, now);
                self.apply_outcome(outcome, now)
            }
        }
    }

    fn apply_outcome(&mut self, outcome: RotationOutcome, now: Instant) -> Result<()> {
        match outcome {
            RotationOutcome::Nothing
            | RotationOutcome::Pending { .. }
            | RotationOutcome::NoReadyBackup => Ok(()),
            RotationOutcome::Stale { slot } => {
                self.stats.record(StatsEvent::StaleCallback { slot });
                Ok(())
            }
            RotationOutcome::ActiveReady { .. } => {
                self.health.reset();
                let playing = self.playing_state();
                self.set_state(playing)
            }
            RotationOutcome::Switched { from, to, reactive } => {
                self.health.reset();
                self.stats.record(StatsEvent::Rotation { from, to, reactive });
                Ok(())
            }
            RotationOutcome::HandoffComplete { slot } => {
                debug!(slot = %slot, "Outgoing slot recycled");
                Ok(())
            }
            RotationOutcome::Aborted { slot } => {
                self.stats.record(StatsEvent::RotationAborted { slot });
                // The active buffer is still approaching its ceiling
                self.local_repair(LocalRepair::ReloadInPlace, now)
            }
            RotationOutcome::ActiveFailed(error) => {
                self.handle_failure(FailureCause::Backend(error), now)
            }
            RotationOutcome::ActiveLoadTimeout { slot } => {
                let error = BackendError::network(format!("{slot} did not become ready"));
                self.handle_failure(FailureCause::Backend(error), now)
            }
        }
    }

    fn health_tick(&mut self, now: Instant) -> Result<()> {
        self.timers.schedule(
            TimerOwner::Session,
            self.generation,
            TimerKind::HealthTick,
            now + self.config.health.tick_interval,
        );
        if !self.state.is_live() || !self.rotation.is_active_ready() {
            return Ok(());
        }

        let snapshot = self.rotation.active_snapshot();
        let status = self.health.observe(now, &snapshot, self.playing);
        if status != self.health_status {
            self.stats.record(StatsEvent::HealthChange {
                from: self.health_status,
                to: status,
            });
            self.health_status = status;
        }

        if let Some(keep_from) = self.trim.on_tick(&snapshot) {
            self.rotation.trim_active(keep_from);
            self.stats.record(StatsEvent::Trim { keep_from });
        }

        // Healthy ticks while a retry is pending do not end the episode
        if self.pending_action.is_some() {
            return Ok(());
        }
        // A healthy classification with a standing cursor neither extends nor breaks a healthy run
        let progressing = !self.playing
            || self
                .health
                .last_sample()
                .is_some_and(|sample| sample.position_advancing);
        if (!status.is_healthy() || progressing) && self.recovery.on_health(status) {
            self.stats.record(StatsEvent::Recovered);
        }

        match status {
            HealthStatus::Healthy => Ok(()),
            HealthStatus::Frozen => self.on_stall(status, FailureCause::Freeze, now),
            HealthStatus::BufferCritical
                if self.health.consecutive(HealthStatus::BufferCritical)
                    >= self.config.health.critical_repeat =>
            {
                self.on_stall(status, FailureCause::Starvation, now)
            }
            HealthStatus::BufferCritical => Ok(()),
            HealthStatus::Degraded if self.health.consecutive(HealthStatus::Degraded) == 1 => {
                self.handle_failure(FailureCause::Degraded, now)
            }
            HealthStatus::Degraded => Ok(()),
        }
    }

    /// Frozen or starving: rotate away if a backup is ready, otherwise repair
    /// the same sink. Rotations draw on the same repair allowance, so a stall
    /// that follows the stream across slots still reaches the retry budget.
    fn on_stall(&mut self, status: HealthStatus, cause: FailureCause, now: Instant) -> Result<()> {
        let Some(repair) = self.recovery.on_anomaly(status) else {
            return self.handle_failure(cause, now);
        };
        if self.rotation.has_ready_backup() {
            let outcome = self.rotation.begin_rotation(true, &mut self.timers, now);
            let switched = matches!(outcome, RotationOutcome::Switched { .. });
            self.apply_outcome(outcome, now)?;
            if switched {
                return Ok(());
            }
        }
        self.local_repair(repair, now)
    }

    fn local_repair(&mut self, repair: LocalRepair, now: Instant) -> Result<()> {
        info!(repair = ?repair, "Local repair");
        self.stats.record(StatsEvent::LocalRepair { repair });
        match repair {
            LocalRepair::SeekNudge(offset) => {
                self.rotation.seek_nudge(offset.as_secs_f64());
                Ok(())
            }
            LocalRepair::ReloadInPlace => {
                self.health.reset();
                let result = self.rotation.reload_active(&mut self.timers, now);
                self.absorb(result, now)
            }
            LocalRepair::TrimBackBuffer => {
                let position = self.rotation.active_snapshot().position;
                let keep_from = position - self.config.trim.keep_back_buffer_secs;
                self.rotation.trim_active(keep_from);
                self.stats.record(StatsEvent::Trim { keep_from });
                Ok(())
            }
        }
    }

    fn handle_failure(&mut self, cause: FailureCause, now: Instant) -> Result<()> {
        let Some(target) = self.target.as_ref() else {
            return Ok(());
        };
        if let Some(pending) = self.pending_action {
            debug!(cause = %cause, pending = %pending, "Failure coalesced into pending recovery");
            return Ok(());
        }

        let ctx = EscalationContext {
            target,
            resolver: &self.resolver,
            tier: self.tier,
        };
        match self.recovery.on_failure(&cause, ctx) {
            Directive::Repair(repair) => self.local_repair(repair, now),
            Directive::Retry {
                attempt,
                action,
                delay,
            } => {
                self.pending_action = Some(action);
                self.timers.reschedule(
                    TimerOwner::Session,
                    self.generation,
                    TimerKind::RetryBackoff,
                    now + delay,
                );
                self.stats.record(StatsEvent::RetryScheduled {
                    attempt,
                    action,
                    backoff_ms: delay.as_millis() as u64,
                });
                self.set_state(SessionState::Recovering)
            }
            Directive::Terminal { attempts, reason } => self.fail(attempts, reason),
            Directive::Ignore => Ok(()),
        }
    }

    /// Backoff elapsed: apply the escalation and reload
    fn execute_pending(&mut self, now: Instant) -> Result<()> {
        let Some(action) = self.pending_action.take() else {
            return Ok(());
        };
        let target = self.target.as_mut().ok_or(Error::NoTarget)?;
        match action {
            RecoveryAction::UseProxy => target.use_proxy = true,
            RecoveryAction::SwitchBackend(kind) => target.backend_kind = kind,
            RecoveryAction::DowngradeQuality(tier) => self.tier = tier,
            RecoveryAction::ReloadSameBackend | RecoveryAction::Recreate => {}
        }
        info!(
            action = %action,
            attempt = self.recovery.attempts(),
            backend = %target.backend_kind,
            use_proxy = target.use_proxy,
            "Executing recovery"
        );

        let plan = self.plan()?;
        self.rotation.set_plan(plan);
        self.health.reset();
        let result = match action {
            RecoveryAction::ReloadSameBackend => self.rotation.reload_active(&mut self.timers, now),
            RecoveryAction::UseProxy
            | RecoveryAction::SwitchBackend(_)
            | RecoveryAction::DowngradeQuality(_) => self.rotation.restart(&mut self.timers, now, true),
            RecoveryAction::Recreate => self.rotation.restart(&mut self.timers, now, false),
        };
        self.absorb(result, now)
    }

    fn fail(&mut self, attempts: u32, reason: String) -> Result<()> {
        let error = Error::RetriesExhausted {
            attempts,
            reason: reason.clone(),
        };
        warn!(error = %error, code = error.error_code(), session_id = %self.id, "Playback failed");
        self.rotation.teardown_all(&mut self.timers);
        self.timers.clear();
        self.generation = self.generation.next();
        self.pending_action = None;
        self.stats.record(StatsEvent::Terminal {
            attempts,
            reason: reason.clone(),
        });
        self.terminal_reason = Some(reason);
        self.set_state(SessionState::Failed)
    }

    #[instrument(skip(self))]
    pub fn play(&mut self) {
        self.playing = true;
        self.rotation.play();
        self.publish();
    }

    #[instrument(skip(self))]
    pub fn pause(&mut self) {
        self.playing = false;
        self.rotation.pause();
        self.publish();
    }

    /// Volume in 0.0..=1.0; out-of-range values are clamped
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.settings.volume = volume;
        self.rotation.apply_settings(self.settings);
        self.publish();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.rotation.apply_settings(self.settings);
        self.publish();
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        let rate = if rate.is_nan() {
            1.0
        } else {
            rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
        };
        self.settings.playback_rate = rate;
        self.rotation.apply_settings(self.settings);
        self.publish();
    }

    /// Quality hint; while playing this reloads the active backend in place
    #[instrument(skip(self, now))]
    pub fn set_quality(&mut self, tier: QualityTier, now: Instant) -> Result<()> {
        if tier == self.tier {
            return Ok(());
        }
        info!(from = %self.tier, to = %tier, "Quality tier changed");
        self.tier = tier;
        if !self.state.is_playing() {
            self.publish();
            return Ok(());
        }

        let plan = self.plan()?;
        self.rotation.set_plan(plan);
        self.health.reset();
        let result = self.rotation.restart(&mut self.timers, now, true);
        let result = self.absorb(result, now);
        self.publish();
        result
    }

    /// User-initiated retry: fresh session for the same target, all recovery state cleared
    #[instrument(skip(self, now))]
    pub fn manual_retry(&mut self, now: Instant) -> Result<()> {
        let url = self
            .target
            .as_ref()
            .map(|t| t.raw_url.to_string())
            .ok_or(Error::NoTarget)?;
        self.load(&url, now)
    }

    /// Tear everything down and forget the target
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Result<()> {
        info!(session_id = %self.id, "Stopping playback");
        self.teardown();
        self.target = None;
        self.set_state(SessionState::Idle)?;
        self.publish();
        Ok(())
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("target", &self.target)
            .field("pending_action", &self.pending_action)
            .finish()
    }
}
