//! Shared registry machinery for periodic and idle handlers.
//!
//! A registry keeps an insertion-ordered live list guarded by a mutex and a
//! cached immutable snapshot of it. Mutations only drop the snapshot; the
//! next dispatch rebuilds it. A dispatch pass captures the snapshot once and
//! iterates it without holding the lock, so handlers may add or remove
//! entries (their own included) from inside a callback. Such changes apply
//! from the next pass on.
//!
//! A handler removed mid-pass that had not yet run in that pass still runs
//! once more, because the pass iterates the snapshot it captured.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::handler::{HandlerKey, IdleHandler, PeriodicHandler};
use crate::logging::{FailureSite, log_handler_failure};

/// Counters describing one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Callbacks that ran to completion.
    pub invoked: usize,
    /// Callbacks that panicked. The panic was logged and swallowed.
    pub failed: usize,
    /// Handlers skipped because an earlier invocation was still on the stack.
    pub skipped: usize,
}

impl DispatchStats {
    /// Number of callbacks that were entered, whether or not they completed.
    pub fn attempted(&self) -> usize {
        self.invoked + self.failed
    }

    pub(crate) fn record<T>(&mut self, outcome: &std::thread::Result<T>) {
        if outcome.is_ok() {
            self.invoked += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Something a [`HandlerRegistry`] knows how to call.
pub(crate) trait Dispatchable: Send + Sync {
    /// Where failures of this kind of handler are reported.
    const SITE: FailureSite;

    fn invoke(&self);

    fn display_name(&self) -> Cow<'_, str>;
}

impl Dispatchable for dyn PeriodicHandler {
    const SITE: FailureSite = FailureSite::Tick;

    fn invoke(&self) {
        self.on_tick();
    }

    fn display_name(&self) -> Cow<'_, str> {
        self.name()
    }
}

impl Dispatchable for dyn IdleHandler {
    const SITE: FailureSite = FailureSite::Idle;

    fn invoke(&self) {
        self.on_idle();
    }

    fn display_name(&self) -> Cow<'_, str> {
        self.name()
    }
}

struct LiveList<H: ?Sized> {
    handlers: Vec<Arc<H>>,
    /// `None` after any mutation until the next dispatch rebuilds it.
    snapshot: Option<Arc<[Arc<H>]>>,
}

/// Thread-safe handler list with snapshot dispatch and a reentrancy guard.
pub(crate) struct HandlerRegistry<H: ?Sized> {
    live: Mutex<LiveList<H>>,
    /// Identities of handlers whose callback is currently on the stack.
    running: Mutex<Vec<HandlerKey>>,
}

impl<H: ?Sized + Dispatchable> HandlerRegistry<H> {
    pub(crate) fn new() -> Self {
        Self {
            live: Mutex::new(LiveList {
                handlers: Vec::new(),
                snapshot: None,
            }),
            running: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, handler: Arc<H>) {
        let mut live = self.live.lock();
        live.handlers.push(handler);
        live.snapshot = None;
    }

    pub(crate) fn remove(&self, handler: &Arc<H>) -> bool {
        let key = HandlerKey::of(handler);
        let mut live = self.live.lock();
        let Some(pos) = live.handlers.iter().position(|h| HandlerKey::of(h) == key) else {
            return false;
        };
        live.handlers.remove(pos);
        live.snapshot = None;
        true
    }

    pub(crate) fn contains(&self, handler: &Arc<H>) -> bool {
        let key = HandlerKey::of(handler);
        self.live.lock().handlers.iter().any(|h| HandlerKey::of(h) == key)
    }

    pub(crate) fn len(&self) -> usize {
        self.live.lock().handlers.len()
    }

    pub(crate) fn clear(&self) {
        let mut live = self.live.lock();
        live.handlers.clear();
        live.snapshot = None;
    }

    /// Return the cached snapshot, rebuilding it if a mutation dropped it.
    fn snapshot(&self) -> Arc<[Arc<H>]> {
        let mut live = self.live.lock();
        if let Some(snapshot) = &live.snapshot {
            return snapshot.clone();
        }
        let snapshot: Arc<[Arc<H>]> = Arc::from(live.handlers.clone());
        live.snapshot = Some(snapshot.clone());
        snapshot
    }

    /// Run every handler of the current snapshot once.
    pub(crate) fn dispatch(&self) -> DispatchStats {
        let snapshot = self.snapshot();
        let mut stats = DispatchStats::default();

        for handler in snapshot.iter() {
            let key = HandlerKey::of(handler);
            if !self.enter(key) {
                tracing::trace!(
                    target: "horizon_pulse_core",
                    handler = %handler.display_name(),
                    "handler already running, skipping nested invocation"
                );
                stats.skipped += 1;
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.invoke()));
            self.leave(key);

            if let Err(payload) = &outcome {
                log_handler_failure(H::SITE, &handler.display_name(), &**payload);
            }
            stats.record(&outcome);
        }

        stats
    }

    fn enter(&self, key: HandlerKey) -> bool {
        let mut running = self.running.lock();
        if running.contains(&key) {
            return false;
        }
        running.push(key);
        true
    }

    fn leave(&self, key: HandlerKey) {
        let mut running = self.running.lock();
        // Nested passes started from inside the callback have already unwound,
        // so the entry is normally last; scan only when it is not.
        if running.last() == Some(&key) {
            running.pop();
        } else if let Some(pos) = running.iter().rposition(|k| *k == key) {
            running.remove(pos);
        }
    }
}
