//! Self-rescheduling refresh scheduler
//!
//! Each cycle arms exactly one continuation timer once it finishes, so a
//! slow cycle delays the next one instead of overlapping it. Every
//! `start` bumps a generation counter and replaces the cancellation token
//! of the previous loop; a loop from an older generation can finish its
//! in-flight cycle but never re-arms.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Work performed on every tick
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self);
}

/// Refresh scheduler; clones share the same loop
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    runner: Arc<dyn CycleRunner>,
    running: AtomicBool,
    generation: AtomicU64,
    /// Token of the live loop, if any
    pending: Mutex<Option<CancellationToken>>,
    /// Serializes cycles across generations
    cycle_lock: tokio::sync::Mutex<()>,
    armed: AtomicUsize,
}

impl RefreshScheduler {
    pub fn new(runner: Arc<dyn CycleRunner>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                runner,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
                cycle_lock: tokio::sync::Mutex::new(()),
                armed: AtomicUsize::new(0),
            }),
        }
    }

    /// Run a cycle now, then every `interval` after each cycle ends.
    ///
    /// Restarting cancels the pending continuation of the previous loop.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let token = CancellationToken::new();
        let generation = {
            let mut pending = self.inner.pending.lock();
            if let Some(previous) = pending.replace(token.clone()) {
                previous.cancel();
                debug!("Restart cancelled the pending refresh continuation");
            }
            self.inner.running.store(true, Ordering::SeqCst);
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        info!(
            "Refresh scheduler started (generation {}, every {}s)",
            generation,
            interval.as_secs()
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.run_loop(generation, token, interval).await;
        });
    }

    /// Cancel the pending continuation. Safe to call when idle.
    pub fn stop(&self) {
        let mut pending = self.inner.pending.lock();
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        if let Some(token) = pending.take() {
            token.cancel();
        }
        if was_running {
            info!("Refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Continuation timers currently waiting to fire
    pub fn armed_timers(&self) -> usize {
        self.inner.armed.load(Ordering::SeqCst)
    }
}

impl SchedulerInner {
    async fn run_loop(&self, generation: u64, token: CancellationToken, interval: Duration) {
        loop {
            {
                let _cycle = self.cycle_lock.lock().await;
                if token.is_cancelled() {
                    return;
                }
                self.runner.run_cycle().await;
            }

            // Checked after the cycle: a stop during the cycle lets it finish
            if !self.is_current(generation) {
                debug!("Refresh generation {} retired, not re-arming", generation);
                return;
            }

            let _armed = ArmedTimer::new(&self.armed);
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

struct ArmedTimer<'a>(&'a AtomicUsize);

impl<'a> ArmedTimer<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ArmedTimer<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
