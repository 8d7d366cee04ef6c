//! UI thread verification for dispatch entry points.
//!
//! Registration calls may come from any thread, but `notify_tick` and
//! `notify_idle` must only be driven by the thread that owns the host event
//! loop. A [`ThreadAffinity`] records that thread when a
//! [`Dispatcher`](crate::Dispatcher) is created, and dispatch entry points
//! check it when thread checks are enabled (the default in debug builds).
//!
//! ```
//! use horizon_pulse_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_same_thread());
//! affinity.assert_same_thread();
//! ```

use std::thread::ThreadId;

/// Thread affinity tracker.
///
/// Records the thread on which it was created and verifies that later
/// operations happen on that same thread.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create a tracker bound to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread matches this affinity.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Assert that we are on the bound thread.
    ///
    /// # Panics
    ///
    /// Panics with a descriptive message if called from a different thread.
    #[inline]
    pub fn assert_same_thread(&self) {
        self.assert_same_thread_with_msg("dispatch must run on the UI thread")
    }

    /// Assert that we are on the bound thread, with a custom message.
    ///
    /// # Panics
    ///
    /// Panics if called from a different thread.
    pub fn assert_same_thread_with_msg(&self, msg: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(msg);
        }
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, msg: &str) -> ! {
        let current = std::thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");
        let current_id = current.id();

        panic!(
            "\n\
            ══════════════════════════════════════════════════════════════════════\n\
            UI THREAD VIOLATION\n\
            ══════════════════════════════════════════════════════════════════════\n\
            \n\
            {msg}\n\
            \n\
            Dispatcher was created on thread: {:?}\n\
            Current thread: \"{current_name}\" (ID: {current_id:?})\n\
            \n\
            Tick and idle notifications must be delivered by the thread that\n\
            runs the host event loop. Registration (register_*, unregister_*,\n\
            run_once_at_idle) is the only cross-thread entry point.\n\
            \n\
            POSSIBLE SOLUTIONS:\n\
            \n\
            1. Use Dispatcher::run_once_at_idle() to hop onto the UI thread\n\
            2. Create the Dispatcher on the thread that runs the event loop\n\
            \n\
            ══════════════════════════════════════════════════════════════════════",
            self.thread_id
        )
    }
}
