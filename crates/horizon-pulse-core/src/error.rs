//! Error types for Horizon Pulse.
//!
//! Only caller-facing API misuse is reported through [`PulseError`]. Failures
//! raised while *running* a registered handler are contained at the call site
//! and logged; they never surface here.

use std::time::Duration;

use thiserror::Error;

/// The main error type for Horizon Pulse operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PulseError {
    /// The operation is not valid in the current state.
    ///
    /// Examples: changing the delay of an armed trigger, binding a host event
    /// source to a dispatcher that already has one.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A delay value falls outside the accepted range.
    #[error("delay {delay:?} is out of range (maximum is {max:?})")]
    OutOfRange {
        /// The rejected value.
        delay: Duration,
        /// The largest accepted value.
        max: Duration,
    },
}

/// A specialized Result type for Horizon Pulse operations.
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PulseError::InvalidOperation("trigger is active");
        assert_eq!(err.to_string(), "invalid operation: trigger is active");

        let err = PulseError::OutOfRange {
            delay: Duration::from_secs(90_000),
            max: Duration::from_secs(86_400),
        };
        assert!(err.to_string().contains("out of range"));
    }
}
