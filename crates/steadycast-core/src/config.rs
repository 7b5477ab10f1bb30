//! Tunable thresholds for the resilience core
//!
//! Every threshold that field deployments tune (stall detection, rotation
//! cadence, retry budget) lives here rather than as a constant. Durations are
//! serialized as integer milliseconds.

use crate::{types::BackendKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Largest fraction of a backend's hard ceiling the rotation interval may use
pub const ROTATION_CEILING_RATIO: f64 = 0.8;

/// Maximum number of sink slots
pub const MAX_SLOTS: usize = 3;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Complete resilience-core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub rotation: RotationConfig,
    pub health: HealthConfig,
    pub retry: RetryConfig,
    pub proxy: ProxyConfig,
    pub trim: TrimConfig,
}

impl ResilienceConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ResilienceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the rotation and recovery machinery cannot honor
    pub fn validate(&self) -> Result<()> {
        self.rotation.validate()?;
        self.health.validate()?;
        self.retry.validate()?;
        self.proxy.validate()?;
        self.trim.validate()
    }
}

/// Buffer rotation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Number of sink slots (1 disables rotation)
    pub slot_count: usize,
    /// Proactive rotation cadence
    #[serde(with = "duration_ms")]
    pub rotation_interval: Duration,
    /// Point at which a TS-over-MSE backend hits its source-buffer boundary
    #[serde(with = "duration_ms")]
    pub ts_ceiling: Duration,
    /// Live-edge window limit for HLS backends
    #[serde(with = "duration_ms")]
    pub hls_ceiling: Duration,
    /// Offset between successive backup warm-ups
    #[serde(with = "duration_ms")]
    pub prewarm_stagger: Duration,
    /// Budget for a loading backend to report first decodable data
    #[serde(with = "duration_ms")]
    pub ready_timeout: Duration,
    /// Crossfade window during which both sinks are visible
    #[serde(with = "duration_ms")]
    pub handoff_window: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            slot_count: 2,
            rotation_interval: Duration::from_secs(25),
            ts_ceiling: Duration::from_secs(38),
            hls_ceiling: Duration::from_secs(45),
            prewarm_stagger: Duration::from_secs(2),
            ready_timeout: Duration::from_secs(10),
            handoff_window: Duration::from_millis(300),
        }
    }
}

impl RotationConfig {
    /// Hard ceiling for the given backend family
    pub fn ceiling_for(&self, kind: BackendKind) -> Duration {
        match kind {
            BackendKind::TsDemux => self.ts_ceiling,
            BackendKind::Hls => self.hls_ceiling,
        }
    }

    /// Whether the rotation interval keeps clear of every backend ceiling
    pub fn rotation_precedes_ceiling(&self) -> bool {
        [BackendKind::TsDemux, BackendKind::Hls].iter().all(|kind| {
            self.rotation_interval.as_secs_f64()
                < self.ceiling_for(*kind).as_secs_f64() * ROTATION_CEILING_RATIO
        })
    }

    fn validate(&self) -> Result<()> {
        if self.slot_count == 0 || self.slot_count > MAX_SLOTS {
            return Err(Error::InvalidConfig(format!(
                "slot_count must be within 1..={MAX_SLOTS}, got {}",
                self.slot_count
            )));
        }
        if self.rotation_interval.is_zero() {
            return Err(Error::InvalidConfig("rotation_interval must be positive".into()));
        }
        if !self.rotation_precedes_ceiling() {
            return Err(Error::InvalidConfig(format!(
                "rotation_interval {}ms must stay below {ROTATION_CEILING_RATIO} x backend ceiling",
                self.rotation_interval.as_millis()
            )));
        }
        if self.ready_timeout.is_zero() {
            return Err(Error::InvalidConfig("ready_timeout must be positive".into()));
        }
        if self.handoff_window >= self.rotation_interval {
            return Err(Error::InvalidConfig(
                "handoff_window must be shorter than rotation_interval".into(),
            ));
        }
        Ok(())
    }
}

/// Health monitor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Sampling period
    #[serde(with = "duration_ms")]
    pub tick_interval: Duration,
    /// Position must advance within this long while playing
    #[serde(with = "duration_ms")]
    pub frozen_threshold: Duration,
    /// Buffered-ahead seconds below which playback is at risk
    pub critical_buffer_secs: f64,
    /// Dropped-frame ratio considered degraded
    pub degraded_ratio: f64,
    /// Consecutive over-threshold samples before reporting Degraded
    pub degraded_hysteresis: u32,
    /// Consecutive BufferCritical samples that warrant a reactive rotation
    pub critical_repeat: u32,
    /// Rolling window length in samples
    pub window: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            frozen_threshold: Duration::from_secs(2),
            critical_buffer_secs: 1.5,
            degraded_ratio: 0.06,
            degraded_hysteresis: 3,
            critical_repeat: 2,
            window: 10,
        }
    }
}

impl HealthConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::InvalidConfig("tick_interval must be positive".into()));
        }
        if self.frozen_threshold < self.tick_interval {
            return Err(Error::InvalidConfig(
                "frozen_threshold must be at least one tick".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.degraded_ratio) {
            return Err(Error::InvalidConfig("degraded_ratio must be within [0, 1)".into()));
        }
        if self.degraded_hysteresis == 0 || self.critical_repeat == 0 {
            return Err(Error::InvalidConfig("hysteresis counts must be positive".into()));
        }
        if self.window < self.degraded_hysteresis as usize {
            return Err(Error::InvalidConfig(
                "window must hold at least degraded_hysteresis samples".into(),
            ));
        }
        Ok(())
    }
}

/// Recovery policy budget and backoff curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// First backoff delay
    #[serde(with = "duration_ms")]
    pub base_backoff: Duration,
    /// Backoff ceiling
    #[serde(with = "duration_ms")]
    pub max_backoff: Duration,
    /// Multiplier between attempts
    pub growth: f64,
    /// Upward jitter as a fraction of the nominal delay
    pub jitter: f64,
    /// Budget for network-class failures
    pub max_retries_network: u32,
    /// Budget for decode failures
    pub max_retries_media: u32,
    /// Budget for malformed streams
    pub max_retries_protocol: u32,
    /// Healthy ticks in a row that end a failure episode
    pub healthy_reset_ticks: u32,
    /// Local repairs tried before a stall counts against the budget
    pub local_repair_limit: u32,
    /// Forward seek applied by a seek-nudge repair
    #[serde(with = "duration_ms")]
    pub seek_nudge: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            growth: 2.0,
            jitter: 0.2,
            max_retries_network: 6,
            max_retries_media: 8,
            max_retries_protocol: 5,
            healthy_reset_ticks: 5,
            local_repair_limit: 2,
            seek_nudge: Duration::from_millis(300),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.base_backoff.is_zero() {
            return Err(Error::InvalidConfig("base_backoff must be positive".into()));
        }
        if self.max_backoff < self.base_backoff {
            return Err(Error::InvalidConfig("max_backoff must be >= base_backoff".into()));
        }
        if self.growth < 1.0 {
            return Err(Error::InvalidConfig("growth must be >= 1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::InvalidConfig("jitter must be within [0, 1]".into()));
        }
        if self.max_retries_network == 0
            || self.max_retries_media == 0
            || self.max_retries_protocol == 0
        {
            return Err(Error::InvalidConfig("retry budgets must be positive".into()));
        }
        if self.healthy_reset_ticks == 0 {
            return Err(Error::InvalidConfig("healthy_reset_ticks must be positive".into()));
        }
        Ok(())
    }
}

/// Relay proxy and backend fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Relay endpoint; the target URL is passed as the `url` query parameter
    pub relay_base: Option<Url>,
    /// Whether the embedding page is served over a secure origin
    pub page_secure: bool,
    /// Ordered backend candidates
    pub fallback_order: Vec<BackendKind>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            relay_base: None,
            page_secure: false,
            fallback_order: vec![BackendKind::TsDemux, BackendKind::Hls],
        }
    }
}

impl ProxyConfig {
    fn validate(&self) -> Result<()> {
        if self.fallback_order.is_empty() {
            return Err(Error::InvalidConfig("fallback_order must not be empty".into()));
        }
        for (i, kind) in self.fallback_order.iter().enumerate() {
            if self.fallback_order[..i].contains(kind) {
                return Err(Error::InvalidConfig(format!(
                    "fallback_order lists {kind} twice"
                )));
            }
        }
        Ok(())
    }
}

/// Back-buffer trimming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Health ticks between trim checks (0 disables trimming)
    pub interval_ticks: u32,
    /// Back buffer length that triggers a trim
    pub max_back_buffer_secs: f64,
    /// Back buffer retained after a trim
    pub keep_back_buffer_secs: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 10,
            max_back_buffer_secs: 30.0,
            keep_back_buffer_secs: 10.0,
        }
    }
}

impl TrimConfig {
    fn validate(&self) -> Result<()> {
        if self.keep_back_buffer_secs < 0.0 || self.keep_back_buffer_secs > self.max_back_buffer_secs {
            return Err(Error::InvalidConfig(
                "keep_back_buffer_secs must be within [0, max_back_buffer_secs]".into(),
            ));
        }
        Ok(())
    }
}
