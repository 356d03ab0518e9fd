//! Repeating timers behind a small trait, so the engine can run on tokio
//! time in production and on hand-fired ticks in tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub type TickFn = Box<dyn FnMut() + Send + 'static>;

pub trait Scheduler: Send {
    /// Starts calling `tick` every `interval`, replacing any running timer.
    fn start(&mut self, interval: Duration, tick: TickFn);
    /// Stops the timer. No tick fires after this returns.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Tokio-backed timer. The first tick fires immediately.
///
/// `start` must run inside a tokio runtime context.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    token: Option<CancellationToken>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn start(&mut self, interval: Duration, mut tick: TickFn) {
        self.stop();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if cancelled.is_cancelled() {
                            break;
                        }
                        tick();
                    }
                }
            }
        });
        self.token = Some(token);
    }

    fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    fn is_running(&self) -> bool {
        self.token.is_some()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
struct ManualTimer {
    interval: Option<Duration>,
    tick: Option<TickFn>,
    fired: u64,
}

/// Timer fired by hand through [`ManualScheduler::fire`]; clones share the
/// same timer so a test can keep one while the engine owns another.
///
/// `tick` runs under the timer lock and must not call back into it.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timer: Arc<Mutex<ManualTimer>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one tick. Returns false when the timer is stopped.
    pub fn fire(&self) -> bool {
        let mut timer = self.lock();
        match timer.tick.as_mut() {
            Some(tick) => {
                tick();
                timer.fired += 1;
                true
            }
            None => false,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.lock().interval
    }

    pub fn fired(&self) -> u64 {
        self.lock().fired
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTimer> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, interval: Duration, tick: TickFn) {
        let mut timer = self.lock();
        timer.interval = Some(interval);
        timer.tick = Some(tick);
    }

    fn stop(&mut self) {
        let mut timer = self.lock();
        timer.interval = None;
        timer.tick = None;
    }

    fn is_running(&self) -> bool {
        self.lock().tick.is_some()
    }
}
