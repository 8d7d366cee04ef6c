//! Idle handler registry and one-shot idle actions.
//!
//! The host event source calls [`IdleRegistry::dispatch_idle`] whenever its
//! input queue is empty. Each pass runs, in order:
//!
//! 1. queued one-shot actions, FIFO, each exactly once;
//! 2. the command refresh hook, if one is set;
//! 3. every registered idle handler, in registration order.
//!
//! One-shot actions queued while a pass is running (from an idle handler, say)
//! wait for the next pass.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::handler::{IdleHandler, OneShotAction};
use crate::logging::{FailureSite, log_handler_failure};
use crate::registry::{DispatchStats, HandlerRegistry};

/// Hook run once per idle pass, before idle handlers.
///
/// This is where an application refreshes the enabled/checked state of its
/// global commands.
pub type CommandRefreshHook = Arc<dyn Fn() + Send + Sync>;

/// Result of one idle pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleReport {
    /// Counters for the one-shot actions drained by this pass.
    pub one_shots: DispatchStats,
    /// Counters for the registered idle handlers.
    pub handlers: DispatchStats,
}

/// Thread-safe registry of idle callbacks.
pub struct IdleRegistry {
    handlers: HandlerRegistry<dyn IdleHandler>,
    one_shots: Mutex<Vec<OneShotAction>>,
    /// Set when `one_shots` may be non-empty. Read without the lock.
    has_one_shots: AtomicBool,
    /// Set by every pass, consumed by the heartbeat check.
    idle_occurred: AtomicBool,
    command_refresh: RwLock<Option<CommandRefreshHook>>,
}

impl IdleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            one_shots: Mutex::new(Vec::new()),
            has_one_shots: AtomicBool::new(false),
            idle_occurred: AtomicBool::new(false),
            command_refresh: RwLock::new(None),
        }
    }

    /// Register a handler. It runs starting with the next pass.
    pub fn add(&self, handler: Arc<dyn IdleHandler>) {
        self.handlers.add(handler);
    }

    /// Remove the first registration of `handler`.
    ///
    /// Returns `true` if it was registered.
    pub fn remove(&self, handler: &Arc<dyn IdleHandler>) -> bool {
        self.handlers.remove(handler)
    }

    /// Check whether `handler` has at least one registration.
    pub fn contains(&self, handler: &Arc<dyn IdleHandler>) -> bool {
        self.handlers.contains(handler)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue an action to run once at the start of the next idle pass.
    ///
    /// Callable from any thread.
    pub fn add_one_shot<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.one_shots.lock().push(Box::new(action));
        self.has_one_shots.store(true, Ordering::Release);
    }

    /// Number of one-shot actions waiting for the next pass.
    pub fn pending_one_shots(&self) -> usize {
        self.one_shots.lock().len()
    }

    /// Install the command refresh hook, replacing any previous one.
    pub fn set_command_refresh<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.command_refresh.write() = Some(Arc::new(hook));
    }

    /// Remove the command refresh hook.
    pub fn clear_command_refresh(&self) {
        *self.command_refresh.write() = None;
    }

    /// Drop every registration and every pending one-shot action.
    ///
    /// The command refresh hook is left in place.
    pub fn clear(&self) {
        self.handlers.clear();
        self.has_one_shots.store(false, Ordering::Release);
        self.one_shots.lock().clear();
    }

    /// Consume the "an idle pass happened" flag.
    ///
    /// Returns whether at least one pass ran since the previous call.
    pub fn take_idle_occurred(&self) -> bool {
        self.idle_occurred.swap(false, Ordering::AcqRel)
    }

    /// Run one idle pass.
    ///
    /// Must be called on the UI thread. Failures in one-shot actions, the
    /// command refresh hook and idle handlers are logged and contained.
    #[tracing::instrument(skip(self), target = "horizon_pulse_core::idle", level = "trace")]
    pub fn dispatch_idle(&self) -> IdleReport {
        let one_shots = self.drain_one_shots();
        self.refresh_commands();
        let handlers = self.handlers.dispatch();
        self.idle_occurred.store(true, Ordering::Release);

        IdleReport {
            one_shots,
            handlers,
        }
    }

    fn drain_one_shots(&self) -> DispatchStats {
        let mut stats = DispatchStats::default();
        if !self.has_one_shots.swap(false, Ordering::AcqRel) {
            return stats;
        }

        let pending = std::mem::take(&mut *self.one_shots.lock());
        tracing::trace!(target: "horizon_pulse_core::idle", count = pending.len(), "running one-shot actions");

        for action in pending {
            let outcome = panic::catch_unwind(AssertUnwindSafe(action));
            if let Err(payload) = &outcome {
                log_handler_failure(FailureSite::OneShot, "one-shot action", &**payload);
            }
            stats.record(&outcome);
        }
        stats
    }

    fn refresh_commands(&self) {
        // Released before the call so the hook may replace itself.
        let Some(hook) = self.command_refresh.read().clone() else {
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook())) {
            log_handler_failure(FailureSite::CommandRefresh, "command refresh", &*payload);
        }
    }
}

impl Default for IdleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
