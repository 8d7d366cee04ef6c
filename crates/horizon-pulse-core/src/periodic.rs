//! Periodic (tick) handler registry.
//!
//! The host event source calls [`PeriodicRegistry::dispatch_tick`] once per
//! tick interval on the UI thread. Every registered handler runs once per
//! tick, in registration order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::handler::PeriodicHandler;
use crate::registry::{DispatchStats, HandlerRegistry};

/// Result of one tick dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number after this dispatch. Wraps to 0 on overflow.
    pub tick: u32,
    /// Per-handler counters for the pass.
    pub handlers: DispatchStats,
}

/// Thread-safe registry of tick callbacks.
pub struct PeriodicRegistry {
    handlers: HandlerRegistry<dyn PeriodicHandler>,
    ticks: AtomicU32,
}

impl PeriodicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            ticks: AtomicU32::new(0),
        }
    }

    /// Register a handler. It receives ticks starting with the next pass.
    ///
    /// Registering the same handler twice creates two independent entries.
    pub fn add(&self, handler: Arc<dyn PeriodicHandler>) {
        self.handlers.add(handler);
    }

    /// Remove the first registration of `handler`.
    ///
    /// Returns `true` if it was registered. A handler removed while a tick is
    /// being dispatched may still run once in that pass.
    pub fn remove(&self, handler: &Arc<dyn PeriodicHandler>) -> bool {
        self.handlers.remove(handler)
    }

    /// Check whether `handler` has at least one registration.
    pub fn contains(&self, handler: &Arc<dyn PeriodicHandler>) -> bool {
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

    /// Drop every registration.
    pub fn clear(&self) {
        self.handlers.clear();
    }

    /// The number of ticks dispatched so far, modulo 2^32.
    pub fn tick_count(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Advance the tick counter and run every registered handler once.
    ///
    /// Must be called on the UI thread. Handler panics are logged and counted
    /// in the report; they never propagate.
    #[tracing::instrument(skip(self), target = "horizon_pulse_core::periodic", level = "trace")]
    pub fn dispatch_tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let handlers = self.handlers.dispatch();
        tracing::trace!(
            target: "horizon_pulse_core::periodic",
            tick,
            invoked = handlers.invoked,
            failed = handlers.failed,
            "tick dispatched"
        );
        TickReport { tick, handlers }
    }
}

impl Default for PeriodicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
