//! Logging facilities for Horizon Pulse.
//!
//! Horizon Pulse uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_pulse_core=debug")
//!         .init();
//! }
//! ```
//!
//! A panicking handler is reported at `error` level under the target of the
//! registry that ran it, with the handler's name and the panic message as
//! structured fields.

use std::any::Any;
use std::borrow::Cow;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_pulse_core";
    /// Periodic handler registry target.
    pub const PERIODIC: &str = "horizon_pulse_core::periodic";
    /// Idle handler registry target.
    pub const IDLE: &str = "horizon_pulse_core::idle";
    /// Delayed trigger target.
    pub const TRIGGER: &str = "horizon_pulse_core::trigger";
    /// Dispatcher shell target.
    pub const DISPATCHER: &str = "horizon_pulse_core::dispatcher";
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> Cow<'_, str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        Cow::Borrowed(msg.as_str())
    } else {
        Cow::Borrowed("<non-string panic payload>")
    }
}

/// Where a contained handler failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureSite {
    Tick,
    Idle,
    OneShot,
    CommandRefresh,
}

/// Report a handler panic that was caught during dispatch.
pub(crate) fn log_handler_failure(site: FailureSite, handler: &str, payload: &(dyn Any + Send)) {
    let message = panic_message(payload);
    match site {
        FailureSite::Tick => {
            tracing::error!(target: "horizon_pulse_core::periodic", handler, panic = %message, "periodic handler panicked");
        }
        FailureSite::Idle => {
            tracing::error!(target: "horizon_pulse_core::idle", handler, panic = %message, "idle handler panicked");
        }
        FailureSite::OneShot => {
            tracing::error!(target: "horizon_pulse_core::idle", handler, panic = %message, "one-shot idle action panicked");
        }
        FailureSite::CommandRefresh => {
            tracing::error!(target: "horizon_pulse_core::idle", handler, panic = %message, "command refresh hook panicked");
        }
    }
}
