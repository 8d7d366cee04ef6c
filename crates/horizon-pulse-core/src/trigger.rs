//! Delayed trigger: coalesces bursts of change notifications into one action.
//!
//! A [`DelayedTrigger`] is either idle or armed. Arming it with
//! [`set_active(true)`](DelayedTrigger::set_active) registers it with the
//! idle registry (zero delay) or the periodic registry (non-zero delay).
//! Arming an already armed trigger only restarts the countdown, so a burst of
//! "something changed" calls results in a single callback once the burst is
//! over.
//!
//! When the trigger fires it unregisters itself and becomes idle *before*
//! calling the handler, so the handler may re-arm it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use horizon_pulse_core::{Dispatcher, DispatcherConfig};
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default());
//! let save = dispatcher.delayed_trigger("save-filters");
//! save.set_delay(Duration::from_millis(2500)).unwrap();
//! save.set_handler(|_| println!("saving filters"));
//!
//! // Each change restarts the countdown; only one save happens.
//! save.set_active(true);
//! save.set_active(true);
//! for _ in 0..3 {
//!     dispatcher.notify_tick();
//! }
//! assert!(!save.is_active());
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::error::{PulseError, Result};
use crate::handler::{IdleHandler, PeriodicHandler};
use crate::idle::IdleRegistry;
use crate::periodic::PeriodicRegistry;

/// The largest accepted trigger delay: 24 hours.
pub const MAX_DELAY: Duration = Duration::from_millis(86_400_000);

/// Callback invoked when a trigger fires.
pub type TriggerHandler = Arc<dyn Fn(&DelayedTrigger) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Periodic,
    Idle,
}

#[derive(Debug)]
struct TriggerState {
    active: bool,
    delay: Duration,
    /// Ticks left before firing.
    skip_counter: u64,
    registration: Option<Registration>,
}

struct TriggerCore {
    this: Weak<TriggerCore>,
    name: Cow<'static, str>,
    tick_interval: Duration,
    periodic: Weak<PeriodicRegistry>,
    idle: Weak<IdleRegistry>,
    state: Mutex<TriggerState>,
    handler: RwLock<Option<TriggerHandler>>,
}

/// Number of ticks to wait for `delay`, rounded up.
fn skip_count(delay: Duration, tick_interval: Duration) -> u64 {
    if delay.is_zero() {
        return 0;
    }
    let interval = tick_interval.as_nanos().max(1);
    let ticks = delay.as_nanos().div_ceil(interval);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

impl TriggerCore {
    fn attach(&self, state: &mut TriggerState) {
        let Some(this) = self.this.upgrade() else {
            return;
        };

        if state.delay.is_zero() {
            if let Some(idle) = self.idle.upgrade() {
                idle.add(this);
                state.registration = Some(Registration::Idle);
            }
        } else if let Some(periodic) = self.periodic.upgrade() {
            periodic.add(this);
            state.registration = Some(Registration::Periodic);
        }

        if state.registration.is_none() {
            state.active = false;
            tracing::warn!(
                target: "horizon_pulse_core::trigger",
                trigger = %self.name,
                "dispatcher is gone, trigger cannot be armed"
            );
        }
    }

    /// Disarm a trigger whose registry dropped it (dispose) or went away.
    fn release_if_orphaned(&self, state: &mut TriggerState) {
        if !state.active {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };

        let registered = match state.registration {
            Some(Registration::Periodic) => self.periodic.upgrade().is_some_and(|periodic| {
                let handler: Arc<dyn PeriodicHandler> = this;
                periodic.contains(&handler)
            }),
            Some(Registration::Idle) => self.idle.upgrade().is_some_and(|idle| {
                let handler: Arc<dyn IdleHandler> = this;
                idle.contains(&handler)
            }),
            None => false,
        };

        if !registered {
            state.active = false;
            state.registration = None;
            tracing::debug!(
                target: "horizon_pulse_core::trigger",
                trigger = %self.name,
                "trigger no longer registered, disarmed"
            );
        }
    }

    fn detach(&self, state: &mut TriggerState) {
        let Some(registration) = state.registration.take() else {
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };

        match registration {
            Registration::Periodic => {
                if let Some(periodic) = self.periodic.upgrade() {
                    let handler: Arc<dyn PeriodicHandler> = this;
                    periodic.remove(&handler);
                }
            }
            Registration::Idle => {
                if let Some(idle) = self.idle.upgrade() {
                    let handler: Arc<dyn IdleHandler> = this;
                    idle.remove(&handler);
                }
            }
        }
    }

    fn perform_fire(&self) {
        {
            let mut state = self.state.lock();
            self.detach(&mut state);
            state.active = false;
        }

        tracing::trace!(target: "horizon_pulse_core::trigger", trigger = %self.name, "trigger fired");

        let handler = self.handler.read().clone();
        let (Some(handler), Some(core)) = (handler, self.this.upgrade()) else {
            return;
        };
        handler(&DelayedTrigger { core });
    }
}

impl PeriodicHandler for TriggerCore {
    fn on_tick(&self) {
        let fire = {
            let mut state = self.state.lock();
            // A snapshot taken before disarming may still deliver this tick.
            if !state.active || state.registration != Some(Registration::Periodic) {
                return;
            }
            state.skip_counter = state.skip_counter.saturating_sub(1);
            state.skip_counter == 0
        };

        if fire {
            self.perform_fire();
        }
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&*self.name)
    }
}

impl IdleHandler for TriggerCore {
    fn on_idle(&self) {
        let fire = {
            let state = self.state.lock();
            state.active && state.registration == Some(Registration::Idle)
        };

        if fire {
            self.perform_fire();
        }
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&*self.name)
    }
}

/// A debouncing trigger driven by a dispatcher's periodic and idle passes.
///
/// Clones share the same trigger. An armed trigger is kept alive by the
/// registry it is registered with; disarm it (or dispose the dispatcher) to
/// release it.
#[derive(Clone)]
pub struct DelayedTrigger {
    core: Arc<TriggerCore>,
}

impl DelayedTrigger {
    /// Create an idle trigger with zero delay bound to the given registries.
    ///
    /// `tick_interval` is the period at which `periodic` is dispatched; it
    /// converts the delay into a number of ticks.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        periodic: &Arc<PeriodicRegistry>,
        idle: &Arc<IdleRegistry>,
        tick_interval: Duration,
    ) -> Self {
        let core = Arc::new_cyclic(|this| TriggerCore {
            this: this.clone(),
            name: name.into(),
            tick_interval,
            periodic: Arc::downgrade(periodic),
            idle: Arc::downgrade(idle),
            state: Mutex::new(TriggerState {
                active: false,
                delay: Duration::ZERO,
                skip_counter: 0,
                registration: None,
            }),
            handler: RwLock::new(None),
        });
        Self { core }
    }

    /// The trigger's diagnostic name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Set the callback run when the trigger fires.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&DelayedTrigger) + Send + Sync + 'static,
    {
        *self.core.handler.write() = Some(Arc::new(handler));
    }

    /// Remove the callback. Firing still disarms the trigger.
    pub fn clear_handler(&self) {
        *self.core.handler.write() = None;
    }

    /// Whether a deferred fire is pending.
    ///
    /// A trigger dropped by [`Dispatcher::dispose`](crate::Dispatcher::dispose)
    /// reports `false`.
    pub fn is_active(&self) -> bool {
        let mut state = self.core.state.lock();
        self.core.release_if_orphaned(&mut state);
        state.active
    }

    /// Arm or disarm the trigger.
    ///
    /// Arming an armed trigger restarts its countdown without registering it
    /// a second time. Disarming unregisters it without calling the handler.
    pub fn set_active(&self, active: bool) {
        let core = &self.core;
        let mut state = core.state.lock();
        core.release_if_orphaned(&mut state);

        if !active {
            if state.active {
                core.detach(&mut state);
                state.active = false;
                tracing::trace!(target: "horizon_pulse_core::trigger", trigger = %core.name, "trigger cancelled");
            }
            return;
        }

        state.skip_counter = skip_count(state.delay, core.tick_interval);
        if state.active {
            tracing::trace!(target: "horizon_pulse_core::trigger", trigger = %core.name, "trigger countdown restarted");
            return;
        }

        state.active = true;
        core.attach(&mut state);
        tracing::trace!(
            target: "horizon_pulse_core::trigger",
            trigger = %core.name,
            skip = state.skip_counter,
            "trigger armed"
        );
    }

    /// The delay between the last arming and the fire.
    pub fn delay(&self) -> Duration {
        self.core.state.lock().delay
    }

    /// Change the delay.
    ///
    /// # Errors
    ///
    /// - [`PulseError::InvalidOperation`] while the trigger is active.
    /// - [`PulseError::OutOfRange`] if `delay` exceeds [`MAX_DELAY`].
    pub fn set_delay(&self, delay: Duration) -> Result<()> {
        let mut state = self.core.state.lock();
        self.core.release_if_orphaned(&mut state);
        if state.active {
            return Err(PulseError::InvalidOperation(
                "cannot change the delay of an active trigger",
            ));
        }
        if delay > MAX_DELAY {
            return Err(PulseError::OutOfRange {
                delay,
                max: MAX_DELAY,
            });
        }
        state.delay = delay;
        Ok(())
    }

    /// Fire now: disarm, then run the handler.
    ///
    /// Works whether or not the trigger is armed. A panic in the handler
    /// propagates to the caller.
    pub fn perform_fire(&self) {
        self.core.perform_fire();
    }
}

impl fmt::Debug for DelayedTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("DelayedTrigger")
            .field("name", &self.core.name)
            .field("active", &state.active)
            .field("delay", &state.delay)
            .field("skip_counter", &state.skip_counter)
            .finish()
    }
}
