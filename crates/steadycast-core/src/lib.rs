//! SteadyCast Core - Playback resilience for live IPTV
//!
//! This crate keeps a live channel playing through the failures that plague
//! browser-style decode stacks:
//! - Decode backend lifecycle with strict attach/load/teardown ordering
//! - Direct/proxied URL resolution with one-way escalation
//! - Health monitoring (frozen picture, buffer starvation, frame drops)
//! - Bounded recovery with capped, jittered backoff
//! - N-slot buffer rotation that hands playback between sinks before a
//!   backend reaches its source-buffer ceiling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       SteadyCast Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Health    │  │   Recovery   │  │     URL      │          │
//! │  │   Monitor    │  │    Policy    │  │   Resolver   │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │◀──── Timer Queue             │
//! │                    │   Session   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Rotation   │                              │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │           ┌───────────────┼───────────────┐                     │
//! │     ┌─────┴─────┐   ┌─────┴─────┐   ┌─────┴─────┐               │
//! │     │  Slot 0   │   │  Slot 1   │   │  Slot 2   │               │
//! │     │ sink +    │   │ sink +    │   │ sink +    │               │
//! │     │ backend   │   │ backend   │   │ backend   │               │
//! │     └───────────┘   └───────────┘   └───────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod timer;
pub mod sink;
pub mod backend;
pub mod buffer;
pub mod resolver;
pub mod health;
pub mod recovery;
pub mod rotation;
pub mod stats;
pub mod session;
pub mod driver;

pub use error::{BackendError, Error, ErrorClass, Result};
pub use types::*;
pub use config::{HealthConfig, ProxyConfig, ResilienceConfig, RetryConfig, RotationConfig, TrimConfig};
pub use timer::{TimerKind, TimerOwner, TimerQueue};
pub use sink::{MediaSink, SinkHandle, SinkProvider, SinkSettings, SinkSnapshot};
pub use backend::{BackendEvent, BackendEventKind, BackendEvents, BackendFactory, BackendHandle, BackendParams, DecodeBackend};
pub use resolver::{Escalation, UrlResolver};
pub use health::{HealthMonitor, HealthSample};
pub use recovery::{Directive, FailureCause, LocalRepair, RecoveryAction, RecoveryPolicy, RecoveryState};
pub use rotation::{LoadPlan, RotationController, RotationOutcome, RotationStats};
pub use stats::{StatsCounters, StatsEvent, StatsRecorder};
pub use session::{PlaybackSession, SessionSnapshot};
pub use driver::{spawn, Command, GateOutcome, SessionHandle, StartGate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "SteadyCast Core initialized");
}
