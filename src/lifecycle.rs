//! Session lifecycle hooks
//!
//! The host registers its own teardown with [`SessionEvents::on_session_end`]
//! and calls [`SessionEvents::end_session`] when the user leaves. The engine
//! installs a single guard in front of that teardown that stops the refresh
//! scheduler; installing it again is a no-op.

use crate::scheduler::RefreshScheduler;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

type Hook<R> = Arc<dyn Fn() -> R + Send + Sync>;
type Guard = Arc<dyn Fn() + Send + Sync>;

/// Session-end observer registry owned by the host
pub struct SessionEvents<R = ()> {
    teardown: Mutex<Option<Hook<R>>>,
    guard: Mutex<Option<Guard>>,
}

impl<R> Default for SessionEvents<R> {
    fn default() -> Self {
        Self {
            teardown: Mutex::new(None),
            guard: Mutex::new(None),
        }
    }
}

impl<R> SessionEvents<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the host's teardown hook, replacing any earlier one
    pub fn on_session_end<F>(&self, hook: F)
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        *self.teardown.lock() = Some(Arc::new(hook));
    }

    /// Signal the end of the session.
    ///
    /// Runs the installed guard, then the host's teardown, and returns the
    /// teardown's value.
    pub fn end_session(&self) -> Option<R> {
        info!("Session ended");
        let guard = self.guard.lock().clone();
        if let Some(guard) = guard {
            guard();
        }

        let teardown = self.teardown.lock().clone();
        teardown.map(|hook| hook())
    }

    /// Whether the engine guard is in place
    pub fn is_intercepted(&self) -> bool {
        self.guard.lock().is_some()
    }

    fn install_guard(&self, guard: Guard) -> bool {
        let mut slot = self.guard.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(guard);
        true
    }
}

/// Installs the scheduler-stopping guard
pub struct LifecycleInterceptor;

impl LifecycleInterceptor {
    /// Returns `false` when a guard was already installed
    pub fn install<R>(events: &SessionEvents<R>, scheduler: &RefreshScheduler) -> bool {
        Self::install_with(events, scheduler, || {})
    }

    /// Like [`install`](Self::install), also running `on_end` once the
    /// scheduler has been stopped
    pub fn install_with<R, F>(
        events: &SessionEvents<R>,
        scheduler: &RefreshScheduler,
        on_end: F,
    ) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        let scheduler = scheduler.clone();
        let installed = events.install_guard(Arc::new(move || {
            scheduler.stop();
            on_end();
        }));
        if installed {
            debug!("Session-end guard installed");
        } else {
            debug!("Session-end guard already present, skipping");
        }
        installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::CycleRunner;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct NoopRunner;

    #[async_trait]
    impl CycleRunner for NoopRunner {
        async fn run_cycle(&self) {}
    }

    #[tokio::test]
    async fn test_guard_stops_scheduler_before_teardown() {
        let scheduler = RefreshScheduler::new(Arc::new(NoopRunner));
        let events: SessionEvents<&'static str> = SessionEvents::new();

        let observed = scheduler.clone();
        events.on_session_end(move || {
            if observed.is_running() {
                "still running"
            } else {
                "stopped first"
            }
        });

        assert!(LifecycleInterceptor::install(&events, &scheduler));
        scheduler.start(Duration::from_secs(60));
        assert!(scheduler.is_running());

        assert_eq!(events.end_session(), Some("stopped first"));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let scheduler = RefreshScheduler::new(Arc::new(NoopRunner));
        let events: SessionEvents = SessionEvents::new();

        assert!(LifecycleInterceptor::install(&events, &scheduler));
        assert!(!LifecycleInterceptor::install(&events, &scheduler));
        assert!(events.is_intercepted());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        events.on_session_end(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(events.end_session(), Some(()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_end_hook_runs_after_stop_and_before_teardown() {
        let scheduler = RefreshScheduler::new(Arc::new(NoopRunner));
        let events: SessionEvents<usize> = SessionEvents::new();

        let ended = Arc::new(AtomicUsize::new(0));
        let seen = ended.clone();
        let observed = scheduler.clone();
        assert!(LifecycleInterceptor::install_with(&events, &scheduler, move || {
            assert!(!observed.is_running());
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let counted = ended.clone();
        events.on_session_end(move || counted.load(Ordering::SeqCst));
        scheduler.start(Duration::from_secs(60));

        assert_eq!(events.end_session(), Some(1));
    }

    #[test]
    fn test_end_without_hooks() {
        let events: SessionEvents<u8> = SessionEvents::new();
        assert!(!events.is_intercepted());
        assert_eq!(events.end_session(), None);
    }

    #[tokio::test]
    async fn test_guard_survives_late_teardown_registration() {
        let scheduler = RefreshScheduler::new(Arc::new(NoopRunner));
        let events: SessionEvents<bool> = SessionEvents::new();
        LifecycleInterceptor::install(&events, &scheduler);

        scheduler.start(Duration::from_secs(60));
        events.on_session_end(|| true);

        assert_eq!(events.end_session(), Some(true));
        assert!(!scheduler.is_running());
    }
}
