//! Prelude module for Horizon Pulse.
//!
//! ```ignore
//! use horizon_pulse::prelude::*;
//! ```

pub use crate::host::{HostError, PulseHost, run_app};
pub use crate::{
    DelayedTrigger, Dispatcher, DispatcherBuilder, DispatcherConfig, FnHandler, IdleHandler,
    PeriodicHandler, PulseError,
};
