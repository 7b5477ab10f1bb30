//! Decode backend adapter
//!
//! Wraps a demuxer/decoder engine (TS-over-MSE or an HLS client) behind a
//! uniform attach/load/unload/destroy contract. Backends report progress
//! through a [`BackendEvents`] emitter stamped with the slot and slot
//! generation they were created for, so events from a torn-down instance can
//! be recognised and dropped.
//!
//! [`BackendHandle`] enforces the lifecycle ordering: attach before load, no
//! second load without unload, and teardown in unload → detach → destroy
//! order. A destroyed handle rejects every call, and dropping a live handle
//! runs the teardown.

use crate::{
    error::BackendError,
    sink::SinkHandle,
    types::{BackendKind, Generation, QualityTier, SlotId},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

/// Backend notification payload
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEventKind {
    /// First decodable data reached the sink
    Ready,
    /// Stream metadata (tracks, codecs) parsed
    Metadata,
    Error(BackendError),
}

/// Backend notification stamped with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub slot: SlotId,
    pub generation: Generation,
    pub kind: BackendEventKind,
}

/// Sending half of the backend event channel
pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;

/// Receiving half of the backend event channel
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Create the channel backends report through
pub fn event_channel() -> (BackendEventSender, BackendEventReceiver) {
    mpsc::unbounded_channel()
}

/// Emitter handed to one backend instance
#[derive(Debug, Clone)]
pub struct BackendEvents {
    slot: SlotId,
    generation: Generation,
    tx: BackendEventSender,
}

impl BackendEvents {
    pub fn new(slot: SlotId, generation: Generation, tx: BackendEventSender) -> Self {
        Self {
            slot,
            generation,
            tx,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn ready(&self) {
        self.emit(BackendEventKind::Ready);
    }

    pub fn metadata(&self) {
        self.emit(BackendEventKind::Metadata);
    }

    pub fn error(&self, error: BackendError) {
        self.emit(BackendEventKind::Error(error));
    }

    fn emit(&self, kind: BackendEventKind) {
        let event = BackendEvent {
            slot: self.slot,
            generation: self.generation,
            kind,
        };
        // The session may already be gone; late events are meaningless then.
        if self.tx.send(event).is_err() {
            debug!(slot = %self.slot, generation = %self.generation, "Backend event after session shutdown");
        }
    }
}

/// Backend tuning derived from the quality tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackendParams {
    pub tier: QualityTier,
    /// Forward buffer the backend should aim for, in seconds
    pub max_buffer_secs: f64,
    /// Starting ABR level bias, 0.0 = lowest rendition, 1.0 = highest
    pub abr_start_bias: f64,
    /// Let the backend's ABR move freely
    pub abr_enabled: bool,
}

impl BackendParams {
    pub fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Low => Self {
                tier,
                max_buffer_secs: 10.0,
                abr_start_bias: 0.0,
                abr_enabled: false,
            },
            QualityTier::Medium => Self {
                tier,
                max_buffer_secs: 20.0,
                abr_start_bias: 0.5,
                abr_enabled: false,
            },
            QualityTier::High => Self {
                tier,
                max_buffer_secs: 30.0,
                abr_start_bias: 1.0,
                abr_enabled: false,
            },
            QualityTier::Auto => Self {
                tier,
                max_buffer_secs: 30.0,
                abr_start_bias: 0.5,
                abr_enabled: true,
            },
        }
    }
}

impl Default for BackendParams {
    fn default() -> Self {
        Self::for_tier(QualityTier::Auto)
    }
}

/// A demuxer/decoder engine.
///
/// `load` consumes network and CPU immediately. `destroy` must release every
/// timer, worker and buffer before returning.
pub trait DecodeBackend: Send {
    fn kind(&self) -> BackendKind;

    fn attach(&mut self, sink: &SinkHandle) -> std::result::Result<(), BackendError>;

    fn load(&mut self, url: &Url) -> std::result::Result<(), BackendError>;

    fn unload(&mut self);

    fn detach(&mut self) {}

    fn destroy(&mut self);
}

/// Builds fresh backend instances
pub trait BackendFactory: Send {
    fn create(
        &mut self,
        kind: BackendKind,
        params: &BackendParams,
        events: BackendEvents,
    ) -> std::result::Result<Box<dyn DecodeBackend>, BackendError>;

    /// Whether this factory can build the given backend family
    fn supports(&self, _kind: BackendKind) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Attached,
    Loaded,
    Destroyed,
}

/// Lifecycle guard around one backend instance, exclusively owned by a slot
pub struct BackendHandle {
    slot: SlotId,
    generation: Generation,
    backend: Box<dyn DecodeBackend>,
    state: HandleState,
    url: Option<Url>,
}

impl BackendHandle {
    pub fn new(slot: SlotId, generation: Generation, backend: Box<dyn DecodeBackend>) -> Self {
        Self {
            slot,
            generation,
            backend,
            state: HandleState::Created,
            url: None,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn attach(&mut self, sink: &SinkHandle) -> Result<()> {
        match self.state {
            HandleState::Destroyed => Err(Error::HandleDestroyed { slot: self.slot }),
            HandleState::Attached | HandleState::Loaded => {
                warn!(slot = %self.slot, "Backend already attached");
                Ok(())
            }
            HandleState::Created => {
                self.backend.attach(sink)?;
                self.state = HandleState::Attached;
                Ok(())
            }
        }
    }

    pub fn load(&mut self, url: &Url) -> Result<()> {
        match self.state {
            HandleState::Destroyed => Err(Error::HandleDestroyed { slot: self.slot }),
            HandleState::Created => Err(Error::NotAttached { slot: self.slot }),
            HandleState::Loaded => Err(Error::AlreadyLoaded { slot: self.slot }),
            HandleState::Attached => {
                self.backend.load(url)?;
                self.state = HandleState::Loaded;
                self.url = Some(url.clone());
                debug!(slot = %self.slot, generation = %self.generation, url = %url, "Backend loading");
                Ok(())
            }
        }
    }

    pub fn unload(&mut self) -> Result<()> {
        match self.state {
            HandleState::Destroyed => Err(Error::HandleDestroyed { slot: self.slot }),
            HandleState::Loaded => {
                self.backend.unload();
                self.state = HandleState::Attached;
                self.url = None;
                Ok(())
            }
            HandleState::Created | HandleState::Attached => Ok(()),
        }
    }

    /// Full teardown: unload, detach, destroy. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == HandleState::Destroyed {
            return;
        }
        if self.state == HandleState::Loaded {
            self.backend.unload();
        }
        if self.state != HandleState::Created {
            self.backend.detach();
        }
        self.backend.destroy();
        self.state = HandleState::Destroyed;
        self.url = None;
        debug!(slot = %self.slot, generation = %self.generation, "Backend destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == HandleState::Destroyed
    }
}

impl Drop for BackendHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .field("kind", &self.backend.kind())
            .field("state", &self.state)
            .finish()
    }
}
