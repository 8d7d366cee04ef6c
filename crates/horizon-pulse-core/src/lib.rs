//! Core systems for Horizon Pulse.
//!
//! This crate coordinates the callbacks a single-threaded GUI event loop runs
//! outside of input handling:
//!
//! - **Periodic handlers**: run once per tick (one second by default)
//! - **Idle handlers**: run whenever the host's input queue is empty
//! - **One-shot idle actions**: run once, at the start of the next idle pass
//! - **Delayed triggers**: coalesce bursts of change notifications into a
//!   single deferred callback
//! - **Dispatcher**: the application-owned object tying the above together,
//!   with the idle heartbeat and initialization / suspension gating
//!
//! The host toolkit is not part of this crate. It only has to call
//! [`Dispatcher::notify_tick`] from its timer and [`Dispatcher::notify_idle`]
//! when it runs out of input, both on the UI thread.
//!
//! A panic inside any registered callback is caught, logged through
//! `tracing` with the handler's name, and counted in the pass report. It
//! never reaches the host and never unregisters the handler.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use horizon_pulse_core::{Dispatcher, DispatcherConfig, FnHandler, PeriodicHandler};
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default());
//! dispatcher.set_initialized(true);
//!
//! let seconds = Arc::new(AtomicUsize::new(0));
//! let counter = seconds.clone();
//! let clock: Arc<dyn PeriodicHandler> = FnHandler::shared("uptime", move || {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! dispatcher.register_periodic(clock.clone());
//!
//! dispatcher.notify_tick();
//! dispatcher.notify_tick();
//! assert_eq!(seconds.load(Ordering::Relaxed), 2);
//!
//! assert!(dispatcher.unregister_periodic(&clock));
//! dispatcher.dispose();
//! ```

mod config;
mod dispatcher;
mod error;
mod handler;
mod idle;
pub mod logging;
mod periodic;
mod registry;
pub mod thread_check;
mod trigger;

pub use config::{
    DEFAULT_HEARTBEAT_EVERY_TICKS, DEFAULT_TICK_INTERVAL, DispatcherBuilder, DispatcherConfig,
};
pub use dispatcher::{Dispatcher, IdleSuspension, TickOutcome};
pub use error::{PulseError, Result};
pub use handler::{FnHandler, IdleHandler, OneShotAction, PeriodicHandler};
pub use idle::{CommandRefreshHook, IdleRegistry, IdleReport};
pub use periodic::{PeriodicRegistry, TickReport};
pub use registry::DispatchStats;
pub use trigger::{DelayedTrigger, MAX_DELAY, TriggerHandler};
