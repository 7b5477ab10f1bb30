//! Core types for SteadyCast

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for one playback session (one stream target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness stamp for a session or slot record.
///
/// Bumped on every teardown; callbacks carrying an older stamp are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Index of a sink slot inside the rotation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub usize);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

/// Decode backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// MPEG-TS demuxed into MSE
    TsDemux,
    /// HLS adaptive-streaming client
    Hls,
}

impl BackendKind {
    /// Guess the natural backend from the URL path
    pub fn detect(url: &Url) -> Self {
        let path = url.path().to_lowercase();
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            BackendKind::Hls
        } else {
            BackendKind::TsDemux
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::TsDemux => write!(f, "ts_demux"),
            BackendKind::Hls => write!(f, "hls"),
        }
    }
}

/// User quality hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    #[default]
    Auto,
}

impl QualityTier {
    /// Next lower tier, if any
    pub fn downgrade(self) -> Option<QualityTier> {
        match self {
            QualityTier::Auto | QualityTier::High => Some(QualityTier::Medium),
            QualityTier::Medium => Some(QualityTier::Low),
            QualityTier::Low => None,
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityTier::Low => write!(f, "low"),
            QualityTier::Medium => write!(f, "medium"),
            QualityTier::High => write!(f, "high"),
            QualityTier::Auto => write!(f, "auto"),
        }
    }
}

/// What to play and how.
///
/// `use_proxy` and `backend_kind` are escalation state: they only ever move
/// forward (direct to proxied, earlier to later fallback candidate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTarget {
    pub raw_url: Url,
    pub use_proxy: bool,
    pub backend_kind: BackendKind,
}

impl StreamTarget {
    pub fn new(raw_url: Url) -> Self {
        let backend_kind = BackendKind::detect(&raw_url);
        Self {
            raw_url,
            use_proxy: false,
            backend_kind,
        }
    }

    pub fn with_backend(mut self, kind: BackendKind) -> Self {
        self.backend_kind = kind;
        self
    }

    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }
}

/// Lifecycle of one sink slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No backend
    Idle,
    /// Backend loading in the background, hidden and muted
    Warming,
    /// Visible, audible slot
    Active,
    /// Outgoing slot inside the handoff window
    Retiring,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotState::Idle => write!(f, "idle"),
            SlotState::Warming => write!(f, "warming"),
            SlotState::Active => write!(f, "active"),
            SlotState::Retiring => write!(f, "retiring"),
        }
    }
}

/// Per-tick health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    BufferCritical,
    Frozen,
    Degraded,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::BufferCritical => write!(f, "buffer_critical"),
            HealthStatus::Frozen => write!(f, "frozen"),
            HealthStatus::Degraded => write!(f, "degraded"),
        }
    }
}

/// Playback session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No target loaded
    #[default]
    Idle,
    /// Target known, waiting for the start gate (ad pre-roll)
    AwaitingGate,
    /// First backend loading
    Initializing,
    /// Playing from the origin
    PlayingDirect,
    /// Playing through the relay proxy
    PlayingProxied,
    /// A recovery action is scheduled or in flight
    Recovering,
    /// Retry budget exhausted
    Failed,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            // Teardown is always allowed
            (_, Idle) |
            // From Idle
            (Idle, AwaitingGate) | (Idle, Initializing) |
            // From AwaitingGate
            (AwaitingGate, Initializing) |
            // From Initializing
            (Initializing, PlayingDirect) | (Initializing, PlayingProxied) |
            (Initializing, Recovering) | (Initializing, Failed) |
            // From PlayingDirect
            (PlayingDirect, Recovering) | (PlayingDirect, PlayingProxied) | (PlayingDirect, Failed) |
            // From PlayingProxied (never back to direct)
            (PlayingProxied, Recovering) | (PlayingProxied, Failed) |
            // From Recovering
            (Recovering, PlayingDirect) | (Recovering, PlayingProxied) | (Recovering, Failed) |
            // From Failed (manual retry)
            (Failed, Initializing)
        )
    }

    /// True while a picture is expected on screen
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::PlayingDirect | SessionState::PlayingProxied)
    }

    /// True while the session owns live backends
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing
                | SessionState::PlayingDirect
                | SessionState::PlayingProxied
                | SessionState::Recovering
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AwaitingGate => write!(f, "awaiting_gate"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::PlayingDirect => write!(f, "playing_direct"),
            SessionState::PlayingProxied => write!(f, "playing_proxied"),
            SessionState::Recovering => write!(f, "recovering"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Opacity and stacking of a sink on the shared surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub opacity: f32,
    pub z_index: i32,
}

impl Visibility {
    pub const HIDDEN: Visibility = Visibility { opacity: 0.0, z_index: 0 };
    pub const BACKGROUND: Visibility = Visibility { opacity: 1.0, z_index: 1 };
    pub const FOREGROUND: Visibility = Visibility { opacity: 1.0, z_index: 2 };

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::HIDDEN
    }
}
