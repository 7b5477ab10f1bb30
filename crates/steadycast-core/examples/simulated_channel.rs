//! Simulated Channel Example
//!
//! Drives a playback session against simulated backends and sinks: backends
//! become ready after a short random delay and occasionally drop the
//! connection, so the run shows proxy escalation, rotation and recovery in
//! the logs.
//!
//! # Usage
//! ```bash
//! RUST_LOG=steadycast_core=debug cargo run --example simulated_channel -- \
//!     http://iptv.example.com/live/user/pass/1001.ts 90
//! ```

use rand::Rng;
use std::env;
use std::time::Duration;
use steadycast_core::*;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Chance that a freshly loaded backend later reports a network error
const FAILURE_RATE: f64 = 0.15;

struct SimulatedSink {
    slot: SlotId,
    base: f64,
    playing_since: Option<Instant>,
}

impl SimulatedSink {
    fn position(&self) -> f64 {
        self.base
            + self
                .playing_since
                .map(|at| at.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }
}

impl MediaSink for SimulatedSink {
    fn handle(&self) -> SinkHandle {
        SinkHandle {
            slot: self.slot,
            element_id: format!("video-{}", self.slot.0),
        }
    }

    fn set_visibility(&mut self, _visibility: Visibility) {}

    fn set_volume(&mut self, _volume: f32) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn set_playback_rate(&mut self, _rate: f32) {}

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.playing_since = None;
    }

    fn seek(&mut self, position: f64) {
        self.base = position;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn snapshot(&self) -> SinkSnapshot {
        let position = self.position();
        SinkSnapshot {
            position,
            buffered: vec![(position.max(10.0) - 10.0, position + 6.0)],
            paused: self.playing_since.is_none(),
            dropped_frames: 0,
            total_frames: (position * 25.0) as u64,
        }
    }

    fn trim_back_buffer(&mut self, _keep_from: f64) {}
}

struct SimulatedBackend {
    kind: BackendKind,
    events: BackendEvents,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl DecodeBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn attach(&mut self, _sink: &SinkHandle) -> std::result::Result<(), BackendError> {
        Ok(())
    }

    fn load(&mut self, url: &Url) -> std::result::Result<(), BackendError> {
        let mut rng = rand::thread_rng();
        let ready_after = Duration::from_millis(rng.gen_range(200..900));
        let fail_after = rng
            .gen_bool(FAILURE_RATE)
            .then(|| Duration::from_secs(rng.gen_range(5..20)));
        let events = self.events.clone();
        tracing::debug!(slot = %events.slot(), url = %url, "Simulated load");

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(ready_after).await;
            events.metadata();
            events.ready();
            if let Some(delay) = fail_after {
                tokio::time::sleep(delay).await;
                events.error(BackendError::network("simulated fragLoadError"));
            }
        }));
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn destroy(&mut self) {
        self.unload();
    }
}

struct SimulatedFactory;

impl BackendFactory for SimulatedFactory {
    fn create(
        &mut self,
        kind: BackendKind,
        _params: &BackendParams,
        events: BackendEvents,
    ) -> std::result::Result<Box<dyn DecodeBackend>, BackendError> {
        Ok(Box::new(SimulatedBackend {
            kind,
            events,
            task: None,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    steadycast_core::init();

    let args: Vec<String> = env::args().collect();
    let url = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "http://iptv.example.com/live/user/pass/1001.ts".to_string());
    let run_for = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60));

    let mut config = ResilienceConfig::default();
    config.rotation.slot_count = 3;
    config.proxy.relay_base = Some(Url::parse("https://relay.example.com/proxy")?);

    let mut sinks = |slot: SlotId| -> Box<dyn MediaSink> {
        Box::new(SimulatedSink {
            slot,
            base: 0.0,
            playing_since: None,
        })
    };
    let session = PlaybackSession::new(config, Box::new(SimulatedFactory), &mut sinks)?;
    let (handle, task) = spawn(session);

    println!("Playing {url} for {}s", run_for.as_secs());
    println!("{}", "=".repeat(60));
    handle.load(url).await?;

    let mut updates = handle.subscribe();
    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);
    let mut last_state = None;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if last_state != Some(snapshot.state) {
                    println!(
                        "{:>16} | backend {:?} | proxy {} | retries {} | rotations {}",
                        snapshot.state.to_string(),
                        snapshot.backend_kind,
                        snapshot.use_proxy,
                        snapshot.retry_count,
                        snapshot.rotation_count,
                    );
                    last_state = Some(snapshot.state);
                }
            }
        }
    }

    let summary = handle.snapshot();
    handle.shutdown().await?;
    task.await.map_err(|_| Error::ChannelClosed)??;

    println!("{}", "=".repeat(60));
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
