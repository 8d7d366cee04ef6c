//! winit host event source.
//!
//! [`PulseHost`] wraps an application's own [`ApplicationHandler`] and drives
//! a [`Dispatcher`] from the winit event loop:
//!
//! - `about_to_wait` (the loop has drained its input) delivers an idle pass;
//! - whenever the tick deadline has passed, one tick is delivered and the
//!   next deadline is `tick_interval` later.
//!
//! Every winit callback is forwarded to the wrapped handler first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use horizon_pulse_core::{Dispatcher, PulseError};
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::{DeviceEvent, DeviceId, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

/// Errors from running a dispatcher on a winit event loop.
#[derive(Debug, Error)]
pub enum HostError {
    /// The dispatcher refused the binding.
    #[error("failed to bind dispatcher: {0}")]
    Bind(#[from] PulseError),
    /// winit failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
}

/// Smallest tick period the host will schedule.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// An [`ApplicationHandler`] that feeds ticks and idle passes to a dispatcher.
pub struct PulseHost<A> {
    dispatcher: Arc<Dispatcher>,
    app: A,
    tick_interval: Duration,
    next_tick: Instant,
}

impl<A> PulseHost<A> {
    /// Bind `dispatcher` to a new host wrapping `app`.
    ///
    /// # Errors
    ///
    /// Fails if the dispatcher already has a host or has been disposed.
    pub fn new(dispatcher: Arc<Dispatcher>, app: A) -> Result<Self, HostError> {
        dispatcher.bind_host()?;
        let tick_interval = dispatcher.config().tick_interval.max(MIN_TICK_INTERVAL);
        Ok(Self {
            dispatcher,
            app,
            tick_interval,
            next_tick: Instant::now() + tick_interval,
        })
    }

    /// The driven dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The wrapped application handler.
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Mutable access to the wrapped application handler.
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// When the next tick is due.
    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Deliver a tick if its deadline has passed.
    ///
    /// A loop that stalled for several intervals gets one tick, not a burst.
    fn deliver_due_tick(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.dispatcher.notify_tick();
        self.next_tick = now + self.tick_interval;
        true
    }

    fn schedule_wake(&self, event_loop: &ActiveEventLoop) {
        let control_flow = wake_control_flow(event_loop.control_flow(), self.next_tick, Instant::now());
        event_loop.set_control_flow(control_flow);
    }
}

/// Choose the control flow for the next wait.
///
/// `Poll` and an application deadline that is still ahead of `now` and earlier
/// than the next tick are kept. Anything else, including an expired deadline
/// from a previous tick, waits for `next_tick`.
fn wake_control_flow(current: ControlFlow, next_tick: Instant, now: Instant) -> ControlFlow {
    match current {
        ControlFlow::Poll => ControlFlow::Poll,
        ControlFlow::WaitUntil(deadline) if deadline > now && deadline < next_tick => current,
        _ => ControlFlow::WaitUntil(next_tick),
    }
}

impl<A> Drop for PulseHost<A> {
    fn drop(&mut self) {
        self.dispatcher.unbind_host();
    }
}

impl<T: 'static, A: ApplicationHandler<T>> ApplicationHandler<T> for PulseHost<A> {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        self.app.new_events(event_loop, cause);
        if let StartCause::ResumeTimeReached { .. } = cause {
            if self.deliver_due_tick(Instant::now()) {
                tracing::trace!(target: "horizon_pulse::host", "tick delivered");
            }
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.app.resumed(event_loop);
        self.schedule_wake(event_loop);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: T) {
        self.app.user_event(event_loop, event);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        self.app.window_event(event_loop, window_id, event);
    }

    fn device_event(&mut self, event_loop: &ActiveEventLoop, device_id: DeviceId, event: DeviceEvent) {
        self.app.device_event(event_loop, device_id, event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.app.about_to_wait(event_loop);

        // Input is drained: this is the host's idle notification.
        self.dispatcher.notify_idle();
        // Under a steady stream of input the timer wake-up may never win.
        self.deliver_due_tick(Instant::now());

        self.schedule_wake(event_loop);
    }

    fn suspended(&mut self, event_loop: &ActiveEventLoop) {
        self.app.suspended(event_loop);
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.app.exiting(event_loop);
        tracing::debug!(target: "horizon_pulse::host", "event loop exiting");
    }

    fn memory_warning(&mut self, event_loop: &ActiveEventLoop) {
        self.app.memory_warning(event_loop);
    }
}

/// Create a winit event loop and run `app` on it, driving `dispatcher`.
///
/// Must be called on the thread that created `dispatcher`. The application
/// still decides when it is initialized via [`Dispatcher::set_initialized`].
///
/// # Errors
///
/// Returns an error if the dispatcher cannot be bound or the event loop
/// cannot be created or run.
pub fn run_app<A: ApplicationHandler>(dispatcher: Arc<Dispatcher>, app: A) -> Result<(), HostError> {
    let event_loop = EventLoop::new()?;
    let mut host = PulseHost::new(dispatcher, app)?;
    tracing::info!(target: "horizon_pulse::host", "starting event loop");
    event_loop.run_app(&mut host)?;
    Ok(())
}
