//! Horizon Pulse - idle and periodic event dispatch for GUI applications.
//!
//! This is the umbrella crate: it re-exports [`horizon_pulse_core`] and adds
//! a winit host adapter in [`host`].
//!
//! # Example
//!
//! ```no_run
//! use horizon_pulse::host::run_app;
//! use horizon_pulse::{DispatcherConfig, Dispatcher, FnHandler};
//! use winit::application::ApplicationHandler;
//! use winit::event::WindowEvent;
//! use winit::event_loop::ActiveEventLoop;
//! use winit::window::WindowId;
//!
//! struct App;
//!
//! impl ApplicationHandler for App {
//!     fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}
//!
//!     fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
//!         if let WindowEvent::CloseRequested = event {
//!             event_loop.exit();
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(DispatcherConfig::default());
//!     dispatcher.register_periodic(FnHandler::shared("clock", || println!("tick")));
//!     dispatcher.set_initialized(true);
//!     Ok(run_app(dispatcher, App)?)
//! }
//! ```

pub use horizon_pulse_core::*;

pub mod host;
pub mod prelude;
