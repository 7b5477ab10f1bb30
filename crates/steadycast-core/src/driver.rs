//! Async driver
//!
//! Runs a [`PlaybackSession`] on one tokio task. The loop selects over UI
//! commands, backend events, the next timer deadline and an optional start
//! gate, so the session itself never needs a lock or a clock of its own.

use crate::{
    session::{PlaybackSession, SessionSnapshot},
    types::QualityTier,
    Error, Result,
};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Command queue depth
const COMMAND_BUFFER: usize = 64;

/// How an external start precondition resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Start the stream
    Proceed,
    /// Abandon the target
    Cancelled,
}

/// External precondition awaited before a target starts playing, such as an
/// ad pre-roll that must finish first
#[async_trait]
pub trait StartGate: Send + Sync {
    async fn wait(&self) -> GateOutcome;
}

type GateFuture = Pin<Box<dyn Future<Output = GateOutcome> + Send>>;

/// UI intents
pub enum Command {
    Load {
        url: String,
        gate: Option<Box<dyn StartGate>>,
    },
    Play,
    Pause,
    SetVolume(f32),
    SetMuted(bool),
    SetPlaybackRate(f32),
    SetQuality(QualityTier),
    Retry,
    Stop,
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Load { url, gate } => f
                .debug_struct("Load")
                .field("url", url)
                .field("gated", &gate.is_some())
                .finish(),
            Command::Play => write!(f, "Play"),
            Command::Pause => write!(f, "Pause"),
            Command::SetVolume(volume) => f.debug_tuple("SetVolume").field(volume).finish(),
            Command::SetMuted(muted) => f.debug_tuple("SetMuted").field(muted).finish(),
            Command::SetPlaybackRate(rate) => f.debug_tuple("SetPlaybackRate").field(rate).finish(),
            Command::SetQuality(tier) => f.debug_tuple("SetQuality").field(tier).finish(),
            Command::Retry => write!(f, "Retry"),
            Command::Stop => write!(f, "Stop"),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    pub async fn load(&self, url: impl Into<String>) -> Result<()> {
        self.send(Command::Load {
            url: url.into(),
            gate: None,
        })
        .await
    }

    /// Load a target that starts only once `gate` resolves
    pub async fn load_gated(&self, url: impl Into<String>, gate: impl StartGate + 'static) -> Result<()> {
        self.send(Command::Load {
            url: url.into(),
            gate: Some(Box::new(gate)),
        })
        .await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume)).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.send(Command::SetMuted(muted)).await
    }

    pub async fn set_playback_rate(&self, rate: f32) -> Result<()> {
        self.send(Command::SetPlaybackRate(rate)).await
    }

    pub async fn set_quality(&self, tier: QualityTier) -> Result<()> {
        self.send(Command::SetQuality(tier)).await
    }

    pub async fn retry(&self) -> Result<()> {
        self.send(Command::Retry).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Latest published projection
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawn the session onto the current tokio runtime
pub fn spawn(session: PlaybackSession) -> (SessionHandle, JoinHandle<Result<()>>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = SessionHandle {
        commands: commands_tx,
        snapshots: session.subscribe(),
    };
    let task = tokio::spawn(run(session, commands_rx));
    (handle, task)
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn wait_gate(gate: &mut Option<GateFuture>) -> GateOutcome {
    match gate {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

/// Session event loop; returns when every handle is dropped or on shutdown
pub async fn run(mut session: PlaybackSession, mut commands: mpsc::Receiver<Command>) -> Result<()> {
    let mut events = session.take_event_receiver().ok_or(Error::ChannelClosed)?;
    let mut gate: Option<GateFuture> = None;
    info!(session_id = %session.id(), "Session driver started");

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All session handles dropped");
                    break;
                };
                if matches!(command, Command::Shutdown) {
                    break;
                }
                if let Err(e) = apply(&mut session, command, &mut gate) {
                    warn!(error = %e, code = e.error_code(), "Command failed");
                }
            }
            Some(event) = events.recv() => {
                if let Err(e) = session.handle_backend_event(event, now()) {
                    warn!(error = %e, code = e.error_code(), "Backend event handling failed");
                }
            }
            _ = sleep_until(deadline) => {
                if let Err(e) = session.advance(now()) {
                    warn!(error = %e, code = e.error_code(), "Timer handling failed");
                }
            }
            outcome = wait_gate(&mut gate) => {
                gate = None;
                let result = match outcome {
                    GateOutcome::Proceed => session.release_gate(now()),
                    GateOutcome::Cancelled => {
                        info!("Start gate cancelled");
                        session.stop()
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, code = e.error_code(), "Start gate handling failed");
                }
            }
        }
    }

    info!(session_id = %session.id(), "Session driver stopping");
    session.stop()
}

fn apply(session: &mut PlaybackSession, command: Command, gate: &mut Option<GateFuture>) -> Result<()> {
    debug!(command = ?command, "Session command");
    match command {
        Command::Load { url, gate: None } => {
            *gate = None;
            session.load(&url, now())
        }
        Command::Load {
            url,
            gate: Some(start_gate),
        } => {
            session.load_gated(&url)?;
            *gate = Some(Box::pin(async move { start_gate.wait().await }));
            Ok(())
        }
        Command::Play => {
            session.play();
            Ok(())
        }
        Command::Pause => {
            session.pause();
            Ok(())
        }
        Command::SetVolume(volume) => {
            session.set_volume(volume);
            Ok(())
        }
        Command::SetMuted(muted) => {
            session.set_muted(muted);
            Ok(())
        }
        Command::SetPlaybackRate(rate) => {
            session.set_playback_rate(rate);
            Ok(())
        }
        Command::SetQuality(tier) => session.set_quality(tier, now()),
        Command::Retry => {
            *gate = None;
            session.manual_retry(now())
        }
        Command::Stop => {
            *gate = None;
            session.stop()
        }
        Command::Shutdown => Ok(()),
    }
}
