//! Media sinks: the rendering targets each slot owns on the shared surface

use crate::types::{SlotId, Visibility};
use serde::{Deserialize, Serialize};

/// Opaque reference a backend uses to bind to a sink's media element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkHandle {
    pub slot: SlotId,
    pub element_id: String,
}

/// User intent applied to every sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Volume in 0.0..=1.0
    pub volume: f32,
    pub muted: bool,
    pub playback_rate: f32,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
        }
    }
}

/// Point-in-time view of a sink's playback counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkSnapshot {
    /// Playback cursor in seconds
    pub position: f64,
    /// Buffered time ranges in seconds
    pub buffered: Vec<(f64, f64)>,
    pub paused: bool,
    /// Cumulative dropped video frames
    pub dropped_frames: u64,
    /// Cumulative decoded video frames
    pub total_frames: u64,
}

/// A rendering target on the shared surface.
///
/// Sinks do no policy of their own; the rotation controller decides which
/// one is visible and audible.
pub trait MediaSink: Send {
    /// Reference handed to backends on attach
    fn handle(&self) -> SinkHandle;

    fn set_visibility(&mut self, visibility: Visibility);

    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);

    fn set_playback_rate(&mut self, rate: f32);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position: f64);

    fn snapshot(&self) -> SinkSnapshot;

    /// Drop buffered media before `keep_from` seconds
    fn trim_back_buffer(&mut self, keep_from: f64);
}

/// Creates one sink per slot on the shared surface
pub trait SinkProvider {
    fn create_sink(&mut self, slot: SlotId) -> Box<dyn MediaSink>;
}

impl<F> SinkProvider for F
where
    F: FnMut(SlotId) -> Box<dyn MediaSink>,
{
    fn create_sink(&mut self, slot: SlotId) -> Box<dyn MediaSink> {
        self(slot)
    }
}
