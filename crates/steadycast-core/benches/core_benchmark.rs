//! Benchmark tests for steadycast-core operations
//!
//! Run with: cargo bench -p steadycast-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::{Duration, Instant};
use url::Url;

use steadycast_core::buffer::BufferedRanges;
use steadycast_core::config::{HealthConfig, ProxyConfig, RetryConfig};
use steadycast_core::recovery::{EscalationContext, FailureCause, RecoveryPolicy};
use steadycast_core::*;

// ============================================================================
// Helpers
// ============================================================================

struct NullSink {
    slot: SlotId,
    position: f64,
}

impl MediaSink for NullSink {
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
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn seek(&mut self, position: f64) {
        self.position = position;
    }
    fn snapshot(&self) -> SinkSnapshot {
        SinkSnapshot {
            position: self.position,
            buffered: vec![(0.0, self.position + 8.0)],
            ..Default::default()
        }
    }
    fn trim_back_buffer(&mut self, _keep_from: f64) {}
}

/// Backend that reports ready as soon as it loads
struct InstantBackend {
    kind: BackendKind,
    events: BackendEvents,
}

impl DecodeBackend for InstantBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }
    fn attach(&mut self, _sink: &SinkHandle) -> std::result::Result<(), BackendError> {
        Ok(())
    }
    fn load(&mut self, _url: &Url) -> std::result::Result<(), BackendError> {
        self.events.ready();
        Ok(())
    }
    fn unload(&mut self) {}
    fn destroy(&mut self) {}
}

struct InstantFactory;

impl BackendFactory for InstantFactory {
    fn create(
        &mut self,
        kind: BackendKind,
        _params: &BackendParams,
        events: BackendEvents,
    ) -> std::result::Result<Box<dyn DecodeBackend>, BackendError> {
        Ok(Box::new(InstantBackend { kind, events }))
    }
}

fn create_session(slot_count: usize) -> PlaybackSession {
    let mut config = ResilienceConfig::default();
    config.rotation.slot_count = slot_count;
    let mut sinks = |slot: SlotId| -> Box<dyn MediaSink> { Box::new(NullSink { slot, position: 0.0 }) };
    PlaybackSession::new(config, Box::new(InstantFactory), &mut sinks)
        .unwrap()
        .with_jitter_seed(1)
}

fn snapshot_at(position: f64, ahead: f64) -> SinkSnapshot {
    SinkSnapshot {
        position,
        buffered: vec![(0.0, position + ahead)],
        total_frames: (position * 25.0) as u64,
        ..Default::default()
    }
}

// ============================================================================
// Health Benchmarks
// ============================================================================

fn bench_health_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("Health Classification");

    group.bench_function("observe_advancing", |b| {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        let t0 = Instant::now();
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            let snapshot = snapshot_at(tick as f64, 8.0);
            black_box(monitor.observe(t0 + Duration::from_secs(tick), &snapshot, true))
        });
    });

    group.bench_function("observe_frozen", |b| {
        let mut monitor = HealthMonitor::new(HealthConfig::default());
        let t0 = Instant::now();
        let snapshot = snapshot_at(42.0, 8.0);
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            black_box(monitor.observe(t0 + Duration::from_secs(tick), &snapshot, true))
        });
    });

    for &count in &[1usize, 8, 64] {
        let ranges: Vec<(f64, f64)> = (0..count)
            .map(|i| (i as f64 * 4.0, i as f64 * 4.0 + 3.95))
            .collect();
        group.bench_with_input(BenchmarkId::new("buffered_ahead", count), &ranges, |b, ranges| {
            b.iter(|| {
                let merged = BufferedRanges::new(black_box(ranges));
                black_box(merged.ahead_of(2.0))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Recovery Benchmarks
// ============================================================================

fn bench_recovery_decisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("Recovery Decisions");
    let resolver = UrlResolver::new(&ProxyConfig {
        relay_base: Some(Url::parse("https://relay.example.com/proxy").unwrap()),
        ..Default::default()
    });
    let target = resolver.initial_target(Url::parse("http://iptv.example.com/live/1.ts").unwrap());
    let cause = FailureCause::Backend(BackendError::network("fragLoadError"));

    group.bench_function("failure_episode", |b| {
        let mut policy = RecoveryPolicy::with_seed(RetryConfig::default(), 9);
        b.iter(|| {
            policy.reset();
            let ctx = EscalationContext {
                target: &target,
                resolver: &resolver,
                tier: QualityTier::Auto,
            };
            for _ in 0..7 {
                black_box(policy.on_failure(&cause, ctx));
            }
        });
    });

    group.bench_function("effective_url_proxied", |b| {
        let mut proxied = target.clone();
        proxied.use_proxy = true;
        b.iter(|| black_box(resolver.effective_url(&proxied).unwrap()));
    });

    group.finish();
}

// ============================================================================
// Timer Benchmarks
// ============================================================================

fn bench_timer_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("Timer Queue");

    for &count in &[16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("schedule_and_drain", count), &count, |b, &count| {
            let t0 = Instant::now();
            b.iter(|| {
                let mut timers = TimerQueue::new();
                for i in 0..count {
                    timers.schedule(
                        TimerOwner::Slot(SlotId(i % 3)),
                        Generation::default(),
                        TimerKind::Prewarm,
                        t0 + Duration::from_millis((i * 37 % 1000) as u64),
                    );
                }
                let mut fired = 0;
                while timers.pop_due(t0 + Duration::from_secs(1)).is_some() {
                    fired += 1;
                }
                black_box(fired)
            });
        });
    }

    group.bench_function("reschedule_churn", |b| {
        let t0 = Instant::now();
        let mut timers = TimerQueue::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            timers.reschedule(
                TimerOwner::Session,
                Generation::default(),
                TimerKind::HealthTick,
                t0 + Duration::from_millis(i),
            );
            black_box(timers.next_deadline())
        });
    });

    group.finish();
}

// ============================================================================
// Session Benchmarks
// ============================================================================

fn bench_session_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Rotation");
    group.sample_size(20);

    for &slots in &[1usize, 2, 3] {
        group.bench_with_input(BenchmarkId::new("ten_minutes_simulated", slots), &slots, |b, &slots| {
            b.iter(|| {
                let mut session = create_session(slots);
                let t0 = Instant::now();
                session.load("http://iptv.example.com/live/1.ts", t0).unwrap();
                let mut now = t0;
                while now < t0 + Duration::from_secs(600) {
                    now += Duration::from_millis(250);
                    session.advance(now).unwrap();
                }
                black_box(session.snapshot().rotation_count)
            });
        });
    }

    group.finish();
}

criterion_group!(health_benches, bench_health_classification);

criterion_group!(recovery_benches, bench_recovery_decisions);

criterion_group!(timer_benches, bench_timer_queue);

criterion_group!(session_benches, bench_session_rotation);

criterion_main!(health_benches, recovery_benches, timer_benches, session_benches);
