//! Mock backends and sinks shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use steadycast_core::{
    BackendError, BackendEvents, BackendFactory, BackendKind, BackendParams, DecodeBackend,
    Generation, MediaSink, PlaybackSession, ResilienceConfig, SinkHandle, SinkProvider,
    SinkSnapshot, SlotId, Visibility,
};
use url::Url;

pub const TS_URL: &str = "http://iptv.example.com/live/user/pass/1001.ts";
pub const RELAY: &str = "https://relay.example.com/proxy";

// =============================================================================
// Sinks
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Visibility(Visibility),
    Volume(f32),
    Muted(bool),
    Rate(f32),
    Play,
    Pause,
    Seek(f64),
    Trim(f64),
}

#[derive(Debug)]
pub struct SinkState {
    pub position: f64,
    pub buffered_ahead: f64,
    pub back_buffer: f64,
    pub paused: bool,
    pub muted: bool,
    pub volume: f32,
    pub rate: f32,
    pub visibility: Visibility,
    /// Cursor stops moving while set
    pub frozen: bool,
    pub dropped_frames: u64,
    pub total_frames: u64,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            position: 0.0,
            buffered_ahead: 8.0,
            back_buffer: 5.0,
            paused: true,
            muted: true,
            volume: 1.0,
            rate: 1.0,
            visibility: Visibility::HIDDEN,
            frozen: false,
            dropped_frames: 0,
            total_frames: 0,
        }
    }
}

pub type OpLog = Arc<Mutex<Vec<(SlotId, SinkOp)>>>;

pub struct MockSink {
    slot: SlotId,
    state: Arc<Mutex<SinkState>>,
    log: OpLog,
}

impl MockSink {
    fn record(&self, op: SinkOp) {
        self.log.lock().unwrap().push((self.slot, op));
    }
}

impl MediaSink for MockSink {
    fn handle(&self) -> SinkHandle {
        SinkHandle {
            slot: self.slot,
            element_id: format!("video-{}", self.slot.0),
        }
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        self.state.lock().unwrap().visibility = visibility;
        self.record(SinkOp::Visibility(visibility));
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
        self.record(SinkOp::Volume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
        self.record(SinkOp::Muted(muted));
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
        self.record(SinkOp::Rate(rate));
    }

    fn play(&mut self) {
        self.state.lock().unwrap().paused = false;
        self.record(SinkOp::Play);
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().paused = true;
        self.record(SinkOp::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.state.lock().unwrap().position = position;
        self.record(SinkOp::Seek(position));
    }

    /// Every sample of a playing, unfrozen sink finds the cursor one second further
    fn snapshot(&self) -> SinkSnapshot {
        let mut state = self.state.lock().unwrap();
        if !state.paused && !state.frozen {
            state.position += 1.0;
            state.total_frames += 25;
        }
        let start = (state.position - state.back_buffer).max(0.0);
        SinkSnapshot {
            position: state.position,
            buffered: vec![(start, state.position + state.buffered_ahead)],
            paused: state.paused,
            dropped_frames: state.dropped_frames,
            total_frames: state.total_frames,
        }
    }

    fn trim_back_buffer(&mut self, keep_from: f64) {
        self.record(SinkOp::Trim(keep_from));
    }
}

/// Shared surface handing out one mock sink per slot
#[derive(Clone, Default)]
pub struct MockSurface {
    pub sinks: Arc<Mutex<Vec<Arc<Mutex<SinkState>>>>>,
    pub log: OpLog,
}

impl MockSurface {
    pub fn sink(&self, slot: usize) -> Arc<Mutex<SinkState>> {
        self.sinks.lock().unwrap()[slot].clone()
    }

    pub fn freeze(&self, slot: usize, frozen: bool) {
        self.sink(slot).lock().unwrap().frozen = frozen;
    }

    pub fn set_buffered_ahead(&self, slot: usize, secs: f64) {
        self.sink(slot).lock().unwrap().buffered_ahead = secs;
    }

    pub fn ops_for(&self, slot: usize) -> Vec<SinkOp> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s.0 == slot)
            .map(|(_, op)| op.clone())
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn unmuted_count(&self) -> usize {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.lock().unwrap().muted)
            .count()
    }
}

impl SinkProvider for MockSurface {
    fn create_sink(&mut self, slot: SlotId) -> Box<dyn MediaSink> {
        let state = Arc::new(Mutex::new(SinkState::default()));
        self.sinks.lock().unwrap().push(state.clone());
        Box::new(MockSink {
            slot,
            state,
            log: self.log.clone(),
        })
    }
}

// =============================================================================
// Backends
// =============================================================================

#[derive(Debug, Clone)]
pub struct Created {
    pub slot: SlotId,
    pub generation: Generation,
    pub kind: BackendKind,
    pub params: BackendParams,
    pub events: BackendEvents,
    pub url: Option<Url>,
}

#[derive(Debug, Default)]
pub struct FactoryState {
    /// Emit Ready as soon as a backend starts loading
    pub auto_ready: bool,
    /// Returned by every `load` while set
    pub load_error: Option<BackendError>,
    pub created: Vec<Created>,
    pub calls: Vec<String>,
    pub live: usize,
    pub max_live: usize,
}

#[derive(Clone, Default)]
pub struct MockFactory {
    pub state: Arc<Mutex<FactoryState>>,
}

impl MockFactory {
    pub fn new(auto_ready: bool) -> Self {
        let factory = Self::default();
        factory.state.lock().unwrap().auto_ready = auto_ready;
        factory
    }

    pub fn set_auto_ready(&self, auto_ready: bool) {
        self.state.lock().unwrap().auto_ready = auto_ready;
    }

    pub fn fail_loads_with(&self, error: Option<BackendError>) {
        self.state.lock().unwrap().load_error = error;
    }

    /// Emitter of the newest backend created for a slot
    pub fn events_for(&self, slot: usize) -> Option<BackendEvents> {
        self.latest(slot).map(|c| c.events)
    }

    pub fn latest(&self, slot: usize) -> Option<Created> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .rev()
            .find(|c| c.slot.0 == slot)
            .cloned()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created.len()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl BackendFactory for MockFactory {
    fn create(
        &mut self,
        kind: BackendKind,
        params: &BackendParams,
        events: BackendEvents,
    ) -> Result<Box<dyn DecodeBackend>, BackendError> {
        let mut state = self.state.lock().unwrap();
        let index = state.created.len();
        state.created.push(Created {
            slot: events.slot(),
            generation: events.generation(),
            kind,
            params: *params,
            events: events.clone(),
            url: None,
        });
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state
            .calls
            .push(format!("create {} {kind}", events.slot()));
        Ok(Box::new(MockBackend {
            index,
            kind,
            events,
            state: self.state.clone(),
        }))
    }
}

pub struct MockBackend {
    index: usize,
    kind: BackendKind,
    events: BackendEvents,
    state: Arc<Mutex<FactoryState>>,
}

impl MockBackend {
    fn call(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("{name} {}", self.events.slot()));
    }
}

impl DecodeBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn attach(&mut self, _sink: &SinkHandle) -> Result<(), BackendError> {
        self.call("attach");
        Ok(())
    }

    fn load(&mut self, url: &Url) -> Result<(), BackendError> {
        self.call("load");
        let auto_ready = {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.load_error.clone() {
                return Err(error);
            }
            state.created[self.index].url = Some(url.clone());
            state.auto_ready
        };
        if auto_ready {
            self.events.ready();
        }
        Ok(())
    }

    fn unload(&mut self) {
        self.call("unload");
    }

    fn detach(&mut self) {
        self.call("detach");
    }

    fn destroy(&mut self) {
        self.call("destroy");
        let mut state = self.state.lock().unwrap();
        state.live = state.live.saturating_sub(1);
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub session: PlaybackSession,
    pub surface: MockSurface,
    pub factory: MockFactory,
    pub t0: Instant,
    pub now: Instant,
}

impl Harness {
    pub fn new(config: ResilienceConfig, auto_ready: bool) -> Self {
        let mut surface = MockSurface::default();
        let factory = MockFactory::new(auto_ready);
        let session = PlaybackSession::new(config, Box::new(factory.clone()), &mut surface)
            .unwrap()
            .with_jitter_seed(7);
        let t0 = Instant::now();
        Self {
            session,
            surface,
            factory,
            t0,
            now: t0,
        }
    }

    pub fn with_relay(slot_count: usize, auto_ready: bool) -> Self {
        let mut config = ResilienceConfig::default();
        config.rotation.slot_count = slot_count;
        config.proxy.relay_base = Some(Url::parse(RELAY).unwrap());
        Self::new(config, auto_ready)
    }

    pub fn load(&mut self, url: &str) {
        self.session.load(url, self.now).unwrap();
        self.session.advance(self.now).unwrap();
    }

    /// Advance simulated time in 100ms steps, calling `each` after every step
    pub fn run_with(&mut self, duration: Duration, mut each: impl FnMut(&mut Self)) {
        let end = self.now + duration;
        while self.now < end {
            self.now += Duration::from_millis(100);
            self.session.advance(self.now).unwrap();
            each(self);
        }
    }

    pub fn run_for(&mut self, duration: Duration) {
        self.run_with(duration, |_| {});
    }

    pub fn elapsed(&self) -> Duration {
        self.now - self.t0
    }

    /// Report an error from the active slot's current backend
    pub fn fail_active(&mut self, error: BackendError) {
        let active = self.session.rotation().active().0;
        let events = self.factory.events_for(active).unwrap();
        events.error(error);
        self.session.advance(self.now).unwrap();
    }
}
