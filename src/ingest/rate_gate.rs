// src/ingest/rate_gate.rs
//! Minimum-delay enforcement between outbound calls.
//!
//! The pipeline is the sole user and runs strictly sequentially, so the gate is
//! a plain `&mut` value: it remembers when the last outbound call completed and
//! `wait(min)` sleeps whatever is left of `min` since then.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Time source for the gate. Swapped for [`ManualClock`] in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, d: Duration);
}

/// Real clock backed by tokio's timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

// --- Test helper ---
/// Virtual clock: `sleep` advances time instantly and records the duration.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(vec![]),
        }
    }

    /// Simulate time passing outside the gate (e.g. a slow request).
    pub fn advance(&self, d: Duration) {
        *self.offset.lock() += d;
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    async fn sleep(&self, d: Duration) {
        self.sleeps.lock().push(d);
        self.advance(d);
    }
}

pub struct RateGate {
    clock: Arc<dyn Clock>,
    request_interval: Duration,
    last_call: Option<Instant>,
}

impl RateGate {
    pub fn new(clock: Arc<dyn Clock>, request_interval: Duration) -> Self {
        Self {
            clock,
            request_interval,
            last_call: None,
        }
    }

    /// Suspend until at least `min` has elapsed since the last outbound call
    /// completed. Returns immediately before the first call.
    pub async fn wait(&mut self, min: Duration) {
        let Some(last) = self.last_call else {
            return;
        };
        let elapsed = self.clock.now().saturating_duration_since(last);
        if elapsed < min {
            let remaining = min - elapsed;
            tracing::trace!(target: "ingest", wait_ms = remaining.as_millis() as u64, "rate gate");
            self.clock.sleep(remaining).await;
        }
    }

    /// `wait` with the per-request interval.
    pub async fn pace(&mut self) {
        let min = self.request_interval;
        self.wait(min).await;
    }

    /// Mark an outbound call as completed now.
    pub fn record_call(&mut self) {
        self.last_call = Some(self.clock.now());
    }
}
