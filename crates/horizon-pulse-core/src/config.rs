//! Dispatcher configuration.

use std::time::Duration;

/// Default period between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of ticks between heartbeat checks.
pub const DEFAULT_HEARTBEAT_EVERY_TICKS: u32 = 3;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Period at which the host delivers ticks.
    ///
    /// Converts trigger delays into tick counts and sets the host adapter's
    /// timer period. A zero interval is treated as the smallest representable
    /// one.
    pub tick_interval: Duration,
    /// Every this many ticks, force an idle pass if the host raised none
    /// since the previous check. `0` disables the heartbeat.
    pub heartbeat_every_ticks: u32,
    /// Verify that tick and idle notifications arrive on the thread that
    /// created the dispatcher.
    pub thread_checks: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            heartbeat_every_ticks: DEFAULT_HEARTBEAT_EVERY_TICKS,
            thread_checks: cfg!(debug_assertions),
        }
    }
}

/// Builder for [`DispatcherConfig`].
///
/// ```
/// use std::time::Duration;
/// use horizon_pulse_core::DispatcherBuilder;
///
/// let dispatcher = DispatcherBuilder::new()
///     .tick_interval(Duration::from_millis(500))
///     .heartbeat_every_ticks(4)
///     .build();
/// assert_eq!(dispatcher.config().heartbeat_every_ticks, 4);
/// ```
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick period.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Set the heartbeat period in ticks (`0` disables it).
    pub fn heartbeat_every_ticks(mut self, ticks: u32) -> Self {
        self.config.heartbeat_every_ticks = ticks;
        self
    }

    /// Enable or disable UI thread checks.
    pub fn thread_checks(mut self, enabled: bool) -> Self {
        self.config.thread_checks = enabled;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Create the dispatcher. The calling thread becomes its UI thread.
    pub fn build(self) -> std::sync::Arc<crate::Dispatcher> {
        crate::Dispatcher::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_every_ticks, 3);
        assert_eq!(config.thread_checks, cfg!(debug_assertions));
    }

    #[test]
    fn test_builder_overrides() {
        let builder = DispatcherBuilder::new()
            .tick_interval(Duration::from_millis(250))
            .heartbeat_every_ticks(0)
            .thread_checks(false);

        let config = builder.config();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.heartbeat_every_ticks, 0);
        assert!(!config.thread_checks);
    }
}
