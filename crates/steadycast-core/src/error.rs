//! Error types for SteadyCast Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SlotId;

/// Result type alias for resilience-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes reported by decode backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Fetch or transport failure
    Network,
    /// Decode or demux failure
    Media,
    /// Malformed manifest or stream
    Protocol,
    /// Buffer or memory growth beyond bounds
    ResourceExhaustion,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Network => write!(f, "network"),
            ErrorClass::Media => write!(f, "media"),
            ErrorClass::Protocol => write!(f, "protocol"),
            ErrorClass::ResourceExhaustion => write!(f, "resource_exhaustion"),
        }
    }
}

/// Error emitted by a decode backend
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{class} error{suffix}: {detail}", suffix = fatal_suffix(.fatal))]
pub struct BackendError {
    /// Failure class
    pub class: ErrorClass,
    /// Backend-native fatality flag
    pub fatal: bool,
    /// Backend-specific detail
    pub detail: String,
}

fn fatal_suffix(fatal: &bool) -> &'static str {
    if *fatal {
        " (fatal)"
    } else {
        ""
    }
}

impl BackendError {
    pub fn new(class: ErrorClass, fatal: bool, detail: impl Into<String>) -> Self {
        Self {
            class,
            fatal,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorClass::Network, false, detail)
    }

    pub fn media(detail: impl Into<String>) -> Self {
        Self::new(ErrorClass::Media, false, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(ErrorClass::Protocol, false, detail)
    }

    /// Builder-style fatality override
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Resilience-core error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Backend lifecycle errors
    #[error("Backend on slot {slot} is already loaded")]
    AlreadyLoaded { slot: SlotId },

    #[error("Backend on slot {slot} is not attached to a sink")]
    NotAttached { slot: SlotId },

    #[error("Backend handle on slot {slot} was already destroyed")]
    HandleDestroyed { slot: SlotId },

    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),

    // Session errors
    #[error("No active stream target")]
    NoTarget,

    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Recovery abandoned after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    // Driver errors
    #[error("Session driver channel closed")]
    ChannelClosed,
}

impl Error {
    /// Returns true if automatic recovery may still succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Backend(e) => e.class != ErrorClass::Protocol || !e.fatal,
            Error::AlreadyLoaded { .. } | Error::NotAttached { .. } => true,
            _ => false,
        }
    }

    /// Returns the error code for the stats log
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::AlreadyLoaded { .. } => "ALREADY_LOADED",
            Error::NotAttached { .. } => "NOT_ATTACHED",
            Error::HandleDestroyed { .. } => "HANDLE_DESTROYED",
            Error::Backend(e) => match e.class {
                ErrorClass::Network => "BACKEND_NETWORK",
                ErrorClass::Media => "BACKEND_MEDIA",
                ErrorClass::Protocol => "BACKEND_PROTOCOL",
                ErrorClass::ResourceExhaustion => "BACKEND_RESOURCE",
            },
            Error::NoTarget => "NO_TARGET",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Error::ChannelClosed => "CHANNEL_CLOSED",
        }
    }
}
