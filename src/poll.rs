//! Bounded polling and the clock it runs on.
//!
//! All waiting in forkfleet (readiness polling and pacing) goes through
//! [`Clock`], so tests can swap in [`ManualClock`] and run in virtual time.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Real time via tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Virtual clock: `sleep` advances time instantly and is recorded.
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).elapsed
    }

    /// Every non-zero sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sleeps
            .clone()
    }

    pub fn advance(&self, duration: Duration) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).elapsed += duration;
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
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts } | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

/// Call `probe` until it returns true or `policy.timeout` elapses.
///
/// Never sleeps past the deadline, and only reports `Ready` after a probe
/// returned true. A zero timeout probes nothing.
pub async fn poll_until<F, Fut>(clock: &dyn Clock, policy: PollPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = clock.now();
    let mut attempts = 0u32;

    loop {
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= policy.timeout {
            return PollOutcome::TimedOut { attempts };
        }

        attempts += 1;
        if probe().await {
            return PollOutcome::Ready { attempts };
        }

        let elapsed = clock.now().saturating_duration_since(start);
        let remaining = policy.timeout.saturating_sub(elapsed);
        if remaining.is_zero() {
            return PollOutcome::TimedOut { attempts };
        }
        clock.sleep(policy.interval.min(remaining)).await;
    }
}
