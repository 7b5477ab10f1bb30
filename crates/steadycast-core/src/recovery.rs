//! Recovery policy
//!
//! State machine that turns failures and anomalous health ticks into
//! directives:
//!
//! ```text
//!   Stable ──failure──▶ Retrying(1) ──failure──▶ Retrying(n+1) ──n > max──▶ Exhausted
//!      ▲                     │
//!      └── sustained healthy ┘
//! ```
//!
//! Frozen and BufferCritical ticks first get cheap local repairs that do not
//! touch the retry budget; only after `local_repair_limit` of them in one
//! stall does it count as a failure. The allowance comes back after
//! `healthy_reset_ticks` healthy ticks in a row. Backoff grows geometrically
//! with upward-only jitter and never decreases within one failure episode.

use crate::{
    config::RetryConfig,
    error::{BackendError, ErrorClass},
    resolver::{Escalation, UrlResolver},
    types::{BackendKind, HealthStatus, QualityTier, StreamTarget},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Policy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum RecoveryState {
    Stable,
    Retrying(u32),
    Exhausted,
}

/// Cheap same-sink repair, not counted against the retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalRepair {
    /// Jump the cursor forward a few hundred milliseconds
    SeekNudge(Duration),
    /// Unload and reload the active backend, resuming at the same position
    ReloadInPlace,
    /// Release back buffer
    TrimBackBuffer,
}

/// Budgeted recovery step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    ReloadSameBackend,
    UseProxy,
    SwitchBackend(BackendKind),
    DowngradeQuality(QualityTier),
    /// Tear down every slot and start over with the current target
    Recreate,
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryAction::ReloadSameBackend => write!(f, "reload"),
            RecoveryAction::UseProxy => write!(f, "use_proxy"),
            RecoveryAction::SwitchBackend(kind) => write!(f, "switch_backend:{kind}"),
            RecoveryAction::DowngradeQuality(tier) => write!(f, "downgrade:{tier}"),
            RecoveryAction::Recreate => write!(f, "recreate"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    Backend(BackendError),
    /// Buffer stayed critical through local repairs
    Starvation,
    /// Position stayed frozen through local repairs
    Freeze,
    /// Dropped-frame ratio stayed over threshold
    Degraded,
}

impl FailureCause {
    /// Class whose retry budget this failure draws from
    pub fn budget_class(&self) -> ErrorClass {
        match self {
            FailureCause::Backend(e) => e.class,
            FailureCause::Starvation | FailureCause::Freeze => ErrorClass::Network,
            FailureCause::Degraded => ErrorClass::Media,
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Backend(e) => write!(f, "{e}"),
            FailureCause::Starvation => write!(f, "buffer starvation"),
            FailureCause::Freeze => write!(f, "playback frozen"),
            FailureCause::Degraded => write!(f, "sustained frame drops"),
        }
    }
}

/// Escalation state the policy consults when picking an action
#[derive(Debug, Clone, Copy)]
pub struct EscalationContext<'a> {
    pub target: &'a StreamTarget,
    pub resolver: &'a UrlResolver,
    pub tier: QualityTier,
}

/// Policy output
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Apply now
    Repair(LocalRepair),
    /// Apply `action` after `delay`
    Retry {
        attempt: u32,
        action: RecoveryAction,
        delay: Duration,
    },
    /// Budget exhausted; surface to the user
    Terminal { attempts: u32, reason: String },
    /// Nothing to do
    Ignore,
}

/// Bounded, backing-off recovery state machine
#[derive(Debug)]
pub struct RecoveryPolicy {
    config: RetryConfig,
    state: RecoveryState,
    attempts: u32,
    last_backoff: Duration,
    healthy_streak: u32,
    repair_streak: u32,
    rng: StdRng,
}

impl RecoveryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic jitter for tests and simulations
    pub fn with_seed(config: RetryConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RetryConfig, rng: StdRng) -> Self {
        Self {
            config,
            state: RecoveryState::Stable,
            attempts: 0,
            last_backoff: Duration::ZERO,
            healthy_streak: 0,
            repair_streak: 0,
            rng,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Failures counted in the current episode
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay of the most recently scheduled retry
    pub fn last_backoff(&self) -> Duration {
        self.last_backoff
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == RecoveryState::Exhausted
    }

    /// Budget for a failure class
    pub fn max_retries(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::Network | ErrorClass::ResourceExhaustion => self.config.max_retries_network,
            ErrorClass::Media => self.config.max_retries_media,
            ErrorClass::Protocol => self.config.max_retries_protocol,
        }
    }

    /// Manual retry: forget everything
    pub fn reset(&mut self) {
        self.state = RecoveryState::Stable;
        self.attempts = 0;
        self.last_backoff = Duration::ZERO;
        self.healthy_streak = 0;
        self.repair_streak = 0;
    }

    /// Feed one health classification; returns true when a failure episode ends
    pub fn on_health(&mut self, status: HealthStatus) -> bool {
        if !status.is_healthy() {
            self.healthy_streak = 0;
            return false;
        }
        self.healthy_streak += 1;
        if self.healthy_streak < self.config.healthy_reset_ticks {
            return false;
        }
        self.repair_streak = 0;

        if let RecoveryState::Retrying(n) = self.state {
            info!(attempts = n, "Stream stable again, retry budget restored");
            self.state = RecoveryState::Stable;
            self.attempts = 0;
            self.last_backoff = Duration::ZERO;
            return true;
        }
        false
    }

    /// Local repair for a Frozen or BufferCritical tick.
    ///
    /// Returns `None` once the repair allowance is used up; the caller should
    /// then report the stall through [`RecoveryPolicy::on_failure`].
    pub fn on_anomaly(&mut self, status: HealthStatus) -> Option<LocalRepair> {
        if self.is_exhausted() {
            return None;
        }
        self.healthy_streak = 0;
        self.repair_streak += 1;
        if self.repair_streak > self.config.local_repair_limit {
            self.repair_streak = 0;
            debug!(status = %status, "Local repairs exhausted");
            return None;
        }
        let repair = match status {
            HealthStatus::Frozen if self.repair_streak == 1 => {
                LocalRepair::SeekNudge(self.config.seek_nudge)
            }
            _ => LocalRepair::ReloadInPlace,
        };
        debug!(status = %status, repair = ?repair, streak = self.repair_streak, "Local repair");
        Some(repair)
    }

    /// Count a failure and decide what to do about it
    pub fn on_failure(&mut self, cause: &FailureCause, ctx: EscalationContext<'_>) -> Directive {
        if self.is_exhausted() {
            debug!(cause = %cause, "Recovery exhausted, ignoring failure");
            return Directive::Ignore;
        }
        if let FailureCause::Backend(e) = cause {
            if e.class == ErrorClass::ResourceExhaustion {
                return Directive::Repair(LocalRepair::TrimBackBuffer);
            }
        }

        let attempt = self.attempts + 1;
        let max = self.max_retries(cause.budget_class());
        self.healthy_streak = 0;

        if attempt > max {
            self.state = RecoveryState::Exhausted;
            warn!(attempts = self.attempts, cause = %cause, "Retry budget exhausted");
            return Directive::Terminal {
                attempts: self.attempts,
                reason: cause.to_string(),
            };
        }

        self.attempts = attempt;
        self.state = RecoveryState::Retrying(attempt);
        let action = self.choose_action(cause, attempt, ctx);
        let delay = self.next_backoff(attempt);

        info!(
            attempt = attempt,
            max = max,
            action = %action,
            backoff_ms = delay.as_millis() as u64,
            cause = %cause,
            "Recovery scheduled"
        );
        Directive::Retry {
            attempt,
            action,
            delay,
        }
    }

    fn choose_action(
        &self,
        cause: &FailureCause,
        attempt: u32,
        ctx: EscalationContext<'_>,
    ) -> RecoveryAction {
        let next_backend = || {
            ctx.resolver
                .next_backend(ctx.target)
                .map(RecoveryAction::SwitchBackend)
        };

        let network_ladder = || match ctx.resolver.escalate_network(ctx.target) {
            Escalation::UseProxy => RecoveryAction::UseProxy,
            Escalation::SwitchBackend(kind) => RecoveryAction::SwitchBackend(kind),
            Escalation::Exhausted if attempt <= 3 => RecoveryAction::ReloadSameBackend,
            Escalation::Exhausted => RecoveryAction::Recreate,
        };

        match cause {
            FailureCause::Backend(e) => match e.class {
                ErrorClass::Network => network_ladder(),
                ErrorClass::Media if attempt <= 2 && !e.fatal => RecoveryAction::ReloadSameBackend,
                ErrorClass::Protocol if attempt == 1 && !e.fatal => RecoveryAction::ReloadSameBackend,
                ErrorClass::Media | ErrorClass::Protocol => {
                    next_backend().unwrap_or(RecoveryAction::Recreate)
                }
                ErrorClass::ResourceExhaustion => RecoveryAction::ReloadSameBackend,
            },
            FailureCause::Starvation => ctx
                .tier
                .downgrade()
                .map(RecoveryAction::DowngradeQuality)
                .unwrap_or(RecoveryAction::Recreate),
            FailureCause::Degraded => ctx
                .tier
                .downgrade()
                .map(RecoveryAction::DowngradeQuality)
                .unwrap_or(RecoveryAction::ReloadSameBackend),
            // A picture that stays frozen through every repair is treated as a delivery problem
            FailureCause::Freeze => network_ladder(),
        }
    }

    /// `min(base * growth^(n-1), cap)` plus upward jitter, clamped to the cap
    /// and never below the previous delay of this episode
    fn next_backoff(&mut self, attempt: u32) -> Duration {
        let base = self.config.base_backoff.as_secs_f64();
        let cap = self.config.max_backoff.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nominal = (base * self.config.growth.powi(exponent)).min(cap);
        let jitter = nominal * self.config.jitter * self.rng.gen::<f64>();
        let delay = Duration::from_secs_f64((nominal + jitter).min(cap)).max(self.last_backoff);
        self.last_backoff = delay;
        delay
    }
}
