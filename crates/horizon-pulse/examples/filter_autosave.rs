//! Debounced autosave example.
//!
//! Every key press in the window "changes a filter". A delayed trigger
//! coalesces the bursts into a single save two seconds after the last key,
//! while a periodic handler prints an uptime clock and an idle handler counts
//! idle passes.
//!
//! Run with: cargo run -p horizon-pulse --example filter_autosave

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use horizon_pulse::host::run_app;
use horizon_pulse::{DelayedTrigger, Dispatcher, DispatcherConfig, FnHandler};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

struct FilterEditor {
    window: Option<Window>,
    autosave: DelayedTrigger,
    edits: u64,
}

impl ApplicationHandler for FilterEditor {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("Filter autosave - type to edit");
        match event_loop.create_window(attributes) {
            Ok(window) => self.window = Some(window),
            Err(err) => {
                eprintln!("Failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                self.edits += 1;
                println!("filter edited ({} edits)", self.edits);
                self.autosave.set_active(true);
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let dispatcher = Dispatcher::new(DispatcherConfig::default());

    let autosave = dispatcher.delayed_trigger("filter-autosave");
    autosave.set_delay(Duration::from_secs(2))?;
    autosave.set_handler(|_| println!("filters saved"));

    let uptime = Arc::new(AtomicU64::new(0));
    let clock = uptime.clone();
    dispatcher.register_periodic(FnHandler::shared("uptime", move || {
        let seconds = clock.fetch_add(1, Ordering::Relaxed) + 1;
        if seconds % 10 == 0 {
            println!("uptime: {seconds}s");
        }
    }));

    let idle_passes = Arc::new(AtomicU64::new(0));
    let counter = idle_passes.clone();
    dispatcher.register_idle(FnHandler::shared("idle-counter", move || {
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    dispatcher.set_initialized(true);

    let app = FilterEditor {
        window: None,
        autosave,
        edits: 0,
    };
    run_app(dispatcher.clone(), app)?;

    println!(
        "exited after {}s and {} idle passes",
        uptime.load(Ordering::Relaxed),
        idle_passes.load(Ordering::Relaxed)
    );
    dispatcher.dispose();
    Ok(())
}
