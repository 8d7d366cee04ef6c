//! The dispatcher: an application-owned pair of periodic and idle registries.
//!
//! A [`Dispatcher`] is created once at application start and handed to
//! whatever needs to register callbacks. The host event source drives it
//! through [`notify_tick`](Dispatcher::notify_tick) and
//! [`notify_idle`](Dispatcher::notify_idle), both on the UI thread.
//!
//! Besides forwarding, the dispatcher owns the policies that involve both
//! registries and the application shell:
//!
//! - **Heartbeat**: some hosts stop reporting idle while under sustained
//!   input. Every `heartbeat_every_ticks` ticks, if no idle pass happened
//!   since the previous check, one idle pass is run from the tick.
//! - **Gating**: idle passes are skipped until the application is marked
//!   initialized, while any [`IdleSuspension`] is alive, and after
//!   [`dispose`](Dispatcher::dispose).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_pulse_core::{Dispatcher, DispatcherConfig, FnHandler};
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default());
//! dispatcher.register_idle(FnHandler::shared("refresh-status", || {}));
//! dispatcher.run_once_at_idle(|| println!("first idle"));
//!
//! // Idle passes are ignored until the shell finishes initializing.
//! assert!(dispatcher.notify_idle().is_none());
//! dispatcher.set_initialized(true);
//! let report = dispatcher.notify_idle().unwrap();
//! assert_eq!(report.one_shots.invoked, 1);
//! assert_eq!(report.handlers.invoked, 1);
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::DispatcherConfig;
use crate::error::{PulseError, Result};
use crate::handler::{IdleHandler, PeriodicHandler};
use crate::idle::{IdleRegistry, IdleReport};
use crate::periodic::{PeriodicRegistry, TickReport};
use crate::thread_check::ThreadAffinity;
use crate::trigger::DelayedTrigger;

/// Result of [`Dispatcher::notify_tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The tick pass itself.
    pub tick: TickReport,
    /// The idle pass forced by the heartbeat, if one ran.
    pub heartbeat: Option<IdleReport>,
}

/// Owner of the periodic and idle registries for one application.
pub struct Dispatcher {
    config: DispatcherConfig,
    periodic: Arc<PeriodicRegistry>,
    idle: Arc<IdleRegistry>,
    /// The UI thread.
    affinity: ThreadAffinity,
    initialized: AtomicBool,
    suspend_depth: AtomicUsize,
    host_bound: AtomicBool,
    disposed: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher. The calling thread becomes its UI thread.
    pub fn new(config: DispatcherConfig) -> Arc<Self> {
        tracing::debug!(target: "horizon_pulse_core::dispatcher", ?config, "creating dispatcher");
        Arc::new(Self {
            config,
            periodic: Arc::new(PeriodicRegistry::new()),
            idle: Arc::new(IdleRegistry::new()),
            affinity: ThreadAffinity::current(),
            initialized: AtomicBool::new(false),
            suspend_depth: AtomicUsize::new(0),
            host_bound: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    /// The configuration this dispatcher was created with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The periodic registry.
    pub fn periodic(&self) -> &Arc<PeriodicRegistry> {
        &self.periodic
    }

    /// The idle registry.
    pub fn idle(&self) -> &Arc<IdleRegistry> {
        &self.idle
    }

    // -------------------------------------------------------------------------
    // Registration (any thread)
    // -------------------------------------------------------------------------

    /// Register a tick handler.
    pub fn register_periodic(&self, handler: Arc<dyn PeriodicHandler>) {
        self.periodic.add(handler);
    }

    /// Remove the first registration of a tick handler.
    pub fn unregister_periodic(&self, handler: &Arc<dyn PeriodicHandler>) -> bool {
        self.periodic.remove(handler)
    }

    /// Register an idle handler.
    pub fn register_idle(&self, handler: Arc<dyn IdleHandler>) {
        self.idle.add(handler);
    }

    /// Remove the first registration of an idle handler.
    pub fn unregister_idle(&self, handler: &Arc<dyn IdleHandler>) -> bool {
        self.idle.remove(handler)
    }

    /// Run `action` once at the start of the next idle pass.
    pub fn run_once_at_idle<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.idle.add_one_shot(action);
    }

    /// Install the hook that refreshes command state on every idle pass.
    pub fn set_command_refresh<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.idle.set_command_refresh(hook);
    }

    /// Remove the command refresh hook.
    pub fn clear_command_refresh(&self) {
        self.idle.clear_command_refresh();
    }

    /// Create an idle delayed trigger driven by this dispatcher.
    pub fn delayed_trigger(&self, name: impl Into<Cow<'static, str>>) -> DelayedTrigger {
        DelayedTrigger::new(name, &self.periodic, &self.idle, self.config.tick_interval)
    }

    // -------------------------------------------------------------------------
    // Application shell state
    // -------------------------------------------------------------------------

    /// Mark the application as (not) finished initializing.
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Release);
    }

    /// Whether the application has finished initializing.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Suspend idle passes until the returned guard is dropped.
    ///
    /// Suspensions nest: idle passes resume once every guard is gone.
    #[must_use = "idle dispatch resumes as soon as the guard is dropped"]
    pub fn suspend_idle(&self) -> IdleSuspension<'_> {
        self.suspend_depth.fetch_add(1, Ordering::AcqRel);
        IdleSuspension { dispatcher: self }
    }

    /// Whether idle passes are currently suspended.
    pub fn is_idle_suspended(&self) -> bool {
        self.suspend_depth.load(Ordering::Acquire) > 0
    }

    // -------------------------------------------------------------------------
    // Host event source (UI thread)
    // -------------------------------------------------------------------------

    /// Record that a host event source now drives this dispatcher.
    ///
    /// # Errors
    ///
    /// [`PulseError::InvalidOperation`] if a host is already bound or the
    /// dispatcher has been disposed.
    pub fn bind_host(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(PulseError::InvalidOperation("dispatcher has been disposed"));
        }
        self.host_bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PulseError::InvalidOperation("a host event source is already bound"))?;
        tracing::debug!(target: "horizon_pulse_core::dispatcher", "host event source bound");
        Ok(())
    }

    /// Detach the host event source, allowing another one to bind.
    pub fn unbind_host(&self) {
        if self.host_bound.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: "horizon_pulse_core::dispatcher", "host event source unbound");
        }
    }

    /// Whether a host event source is bound.
    pub fn is_host_bound(&self) -> bool {
        self.host_bound.load(Ordering::Acquire)
    }

    /// Deliver one tick.
    ///
    /// Returns `None` once the dispatcher is disposed.
    ///
    /// # Panics
    ///
    /// With thread checks enabled, panics if called off the UI thread.
    pub fn notify_tick(&self) -> Option<TickOutcome> {
        self.check_ui_thread("notify_tick must be called on the UI thread");
        if self.is_disposed() {
            return None;
        }

        let tick = self.periodic.dispatch_tick();
        let heartbeat = self.heartbeat(tick.tick);
        Some(TickOutcome { tick, heartbeat })
    }

    /// Deliver one idle notification.
    ///
    /// Returns `None` without running anything if the application is not
    /// initialized, idle dispatch is suspended or the dispatcher is disposed.
    ///
    /// # Panics
    ///
    /// With thread checks enabled, panics if called off the UI thread.
    pub fn notify_idle(&self) -> Option<IdleReport> {
        self.check_ui_thread("notify_idle must be called on the UI thread");
        if self.is_disposed() || !self.is_initialized() || self.is_idle_suspended() {
            tracing::trace!(target: "horizon_pulse_core::dispatcher", "idle pass skipped");
            return None;
        }

        Some(self.idle.dispatch_idle())
    }

    fn heartbeat(&self, tick: u32) -> Option<IdleReport> {
        let every = self.config.heartbeat_every_ticks;
        if every == 0 || tick % every != 0 {
            return None;
        }
        if self.idle.take_idle_occurred() {
            return None;
        }

        tracing::trace!(target: "horizon_pulse_core::dispatcher", tick, "no idle since last check, forcing idle pass");
        let report = self.notify_idle();
        // The forced pass must not count as natural idle at the next check.
        self.idle.take_idle_occurred();
        report
    }

    fn check_ui_thread(&self, msg: &str) {
        if self.config.thread_checks {
            self.affinity.assert_same_thread_with_msg(msg);
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Shut down: drop every registration, pending one-shot action and the
    /// command refresh hook, detach the host, and ignore later notifications.
    ///
    /// Calling it again does nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.periodic.clear();
        self.idle.clear();
        self.idle.clear_command_refresh();
        self.host_bound.store(false, Ordering::Release);
        tracing::debug!(target: "horizon_pulse_core::dispatcher", "dispatcher disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Guard returned by [`Dispatcher::suspend_idle`].
pub struct IdleSuspension<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for IdleSuspension<'_> {
    fn drop(&mut self) {
        self.dispatcher.suspend_depth.fetch_sub(1, Ordering::AcqRel);
    }
}

static_assertions::assert_impl_all!(Dispatcher: Send, Sync);
static_assertions::assert_impl_all!(DelayedTrigger: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use parking_lot::Mutex;

    fn ready() -> Arc<Dispatcher> {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        dispatcher.set_initialized(true);
        dispatcher
    }

    fn idle_counter(dispatcher: &Dispatcher) -> Arc<Mutex<usize>> {
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        dispatcher.register_idle(FnHandler::shared("idle-counter", move || *count_clone.lock() += 1));
        count
    }

    #[test]
    fn test_heartbeat_forces_idle_every_third_tick() {
        let dispatcher = ready();
        let idle_runs = idle_counter(&dispatcher);

        assert!(dispatcher.notify_tick().unwrap().heartbeat.is_none());
        assert!(dispatcher.notify_tick().unwrap().heartbeat.is_none());
        let third = dispatcher.notify_tick().unwrap();
        assert_eq!(third.tick.tick, 3);
        assert!(third.heartbeat.is_some());
        assert_eq!(*idle_runs.lock(), 1);

        // The forced pass does not mask a missing natural idle next window.
        for _ in 0..3 {
            dispatcher.notify_tick();
        }
        assert_eq!(*idle_runs.lock(), 2);
    }

    #[test]
    fn test_heartbeat_skipped_after_natural_idle() {
        let dispatcher = ready();
        let idle_runs = idle_counter(&dispatcher);

        dispatcher.notify_tick();
        dispatcher.notify_idle();
        dispatcher.notify_tick();
        let third = dispatcher.notify_tick().unwrap();
        assert!(third.heartbeat.is_none());
        assert_eq!(*idle_runs.lock(), 1);
    }

    #[test]
    fn test_heartbeat_disabled() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            heartbeat_every_ticks: 0,
            ..Default::default()
        });
        dispatcher.set_initialized(true);
        let idle_runs = idle_counter(&dispatcher);

        for _ in 0..9 {
            assert!(dispatcher.notify_tick().unwrap().heartbeat.is_none());
        }
        assert_eq!(*idle_runs.lock(), 0);
    }

    #[test]
    fn test_idle_gated_until_initialized() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default());
        let idle_runs = idle_counter(&dispatcher);

        assert!(dispatcher.notify_idle().is_none());
        dispatcher.set_initialized(true);
        assert!(dispatcher.notify_idle().is_some());
        assert_eq!(*idle_runs.lock(), 1);
    }

    #[test]
    fn test_suspension_nests() {
        let dispatcher = ready();
        let idle_runs = idle_counter(&dispatcher);

        let outer = dispatcher.suspend_idle();
        let inner = dispatcher.suspend_idle();
        assert!(dispatcher.notify_idle().is_none());
        drop(inner);
        assert!(dispatcher.is_idle_suspended());
        assert!(dispatcher.notify_idle().is_none());
        drop(outer);

        assert!(!dispatcher.is_idle_suspended());
        assert!(dispatcher.notify_idle().is_some());
        assert_eq!(*idle_runs.lock(), 1);
    }

    #[test]
    fn test_bind_host_twice_fails() {
        let dispatcher = ready();
        dispatcher.bind_host().unwrap();
        assert!(matches!(dispatcher.bind_host(), Err(PulseError::InvalidOperation(_))));

        dispatcher.unbind_host();
        assert!(dispatcher.bind_host().is_ok());
    }

    #[test]
    fn test_dispose_clears_and_silences() {
        let dispatcher = ready();
        let idle_runs = idle_counter(&dispatcher);
        dispatcher.register_periodic(FnHandler::shared("tick", || {}));
        dispatcher.run_once_at_idle(|| panic!("must not run after dispose"));
        dispatcher.bind_host().unwrap();

        dispatcher.dispose();
        assert!(dispatcher.is_disposed());
        assert!(!dispatcher.is_host_bound());
        assert!(dispatcher.periodic().is_empty());
        assert!(dispatcher.idle().is_empty());
        assert_eq!(dispatcher.idle().pending_one_shots(), 0);
        assert!(dispatcher.notify_tick().is_none());
        assert!(dispatcher.notify_idle().is_none());
        assert!(dispatcher.bind_host().is_err());
        assert_eq!(*idle_runs.lock(), 0);

        dispatcher.dispose();
    }

    #[test]
    fn test_notify_from_other_thread_panics() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            thread_checks: true,
            ..Default::default()
        });

        let result = std::thread::spawn(move || {
            dispatcher.notify_tick();
        })
        .join();
        assert!(result.is_err());
    }

    #[test]
    fn test_gated_notify_idle_still_checks_thread() {
        // Not initialized: the pass would be skipped anyway.
        let dispatcher = Dispatcher::new(DispatcherConfig {
            thread_checks: true,
            ..Default::default()
        });

        let payload = std::thread::spawn(move || {
            dispatcher.notify_idle();
        })
        .join()
        .unwrap_err();

        let message = crate::logging::panic_message(&*payload);
        assert!(message.contains("UI THREAD VIOLATION"));
        assert!(message.contains("notify_idle must be called on the UI thread"));
    }

    #[test]
    fn test_thread_checks_disabled() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            thread_checks: false,
            ..Default::default()
        });

        let result = std::thread::spawn(move || dispatcher.notify_tick().is_some()).join();
        assert!(matches!(result, Ok(true)));
    }

    #[test]
    fn test_register_from_other_thread() {
        let dispatcher = ready();
        let ran = Arc::new(AtomicBool::new(false));

        let remote = dispatcher.clone();
        let ran_clone = ran.clone();
        std::thread::spawn(move || {
            remote.run_once_at_idle(move || ran_clone.store(true, Ordering::SeqCst));
        })
        .join()
        .unwrap();

        dispatcher.notify_idle();
        assert!(ran.load(Ordering::SeqCst));
    }
}
