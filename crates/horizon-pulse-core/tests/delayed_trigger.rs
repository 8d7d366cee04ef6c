//! Integration tests for delayed triggers driven by a dispatcher.

use std::sync::Arc;
use std::time::Duration;

use horizon_pulse_core::{DelayedTrigger, Dispatcher, DispatcherConfig, PulseError};
use parking_lot::Mutex;

fn setup() -> Arc<Dispatcher> {
    let dispatcher = Dispatcher::new(DispatcherConfig {
        heartbeat_every_ticks: 0,
        ..Default::default()
    });
    dispatcher.set_initialized(true);
    dispatcher
}

fn fire_counter(trigger: &DelayedTrigger) -> Arc<Mutex<usize>> {
    let fired = Arc::new(Mutex::new(0));
    let fired_clone = fired.clone();
    trigger.set_handler(move |_| *fired_clone.lock() += 1);
    fired
}

#[test]
fn test_zero_delay_fires_on_next_idle_once() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("zero-delay");
    let fired = fire_counter(&trigger);

    trigger.set_active(true);
    assert!(trigger.is_active());

    dispatcher.notify_idle();
    assert_eq!(*fired.lock(), 1);
    assert!(!trigger.is_active());

    dispatcher.notify_idle();
    dispatcher.notify_idle();
    assert_eq!(*fired.lock(), 1);
    assert!(dispatcher.idle().is_empty());
}

#[test]
fn test_delay_counts_down_in_ticks() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("countdown");
    trigger.set_delay(Duration::from_millis(2500)).unwrap();
    let fired = fire_counter(&trigger);

    trigger.set_active(true);

    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 0);
    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 0);
    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 1);
    assert!(!trigger.is_active());

    for _ in 0..5 {
        dispatcher.notify_tick();
    }
    assert_eq!(*fired.lock(), 1);
    assert!(dispatcher.periodic().is_empty());
}

#[test]
fn test_delayed_trigger_ignores_idle_passes() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("ticks-only");
    trigger.set_delay(Duration::from_secs(1)).unwrap();
    let fired = fire_counter(&trigger);

    trigger.set_active(true);
    for _ in 0..5 {
        dispatcher.notify_idle();
    }
    assert_eq!(*fired.lock(), 0);

    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 1);
}

#[test]
fn test_rearm_resets_countdown_without_second_registration() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("filters-changed");
    trigger.set_delay(Duration::from_millis(2000)).unwrap();
    let fired = fire_counter(&trigger);

    trigger.set_active(true);
    dispatcher.notify_tick();

    // Burst of changes: restart the countdown.
    trigger.set_active(true);
    trigger.set_active(true);
    assert_eq!(dispatcher.periodic().len(), 1);

    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 0);
    dispatcher.notify_tick();
    assert_eq!(*fired.lock(), 1);

    for _ in 0..4 {
        dispatcher.notify_tick();
    }
    assert_eq!(*fired.lock(), 1);
}

#[test]
fn test_handler_can_rearm_trigger() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("retry");
    let attempts = Arc::new(Mutex::new(0));

    let attempts_clone = attempts.clone();
    trigger.set_handler(move |t| {
        let mut attempts = attempts_clone.lock();
        *attempts += 1;
        // Resource busy: try again at the next idle pass.
        if *attempts < 3 {
            assert!(!t.is_active());
            t.set_active(true);
        }
    });

    trigger.set_active(true);
    for _ in 0..5 {
        dispatcher.notify_idle();
    }
    assert_eq!(*attempts.lock(), 3);
    assert!(!trigger.is_active());
}

#[test]
fn test_cancel_before_fire() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("cancelled");
    trigger.set_delay(Duration::from_secs(2)).unwrap();
    let fired = fire_counter(&trigger);

    trigger.set_active(true);
    dispatcher.notify_tick();
    trigger.set_active(false);
    for _ in 0..4 {
        dispatcher.notify_tick();
    }
    assert_eq!(*fired.lock(), 0);
    assert!(dispatcher.periodic().is_empty());
}

#[test]
fn test_set_delay_while_active_is_rejected() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("locked-delay");
    trigger.set_delay(Duration::from_millis(750)).unwrap();
    trigger.set_active(true);

    assert_eq!(
        trigger.set_delay(Duration::ZERO),
        Err(PulseError::InvalidOperation(
            "cannot change the delay of an active trigger"
        ))
    );
    assert_eq!(trigger.delay(), Duration::from_millis(750));

    trigger.set_active(false);
    assert!(trigger.set_delay(Duration::ZERO).is_ok());
}

#[test]
fn test_panicking_trigger_handler_is_contained() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("faulty");
    trigger.set_handler(|_| panic!("faulty trigger handler"));

    trigger.set_active(true);
    let report = dispatcher.notify_idle().unwrap();
    assert_eq!(report.handlers.failed, 1);
    assert!(!trigger.is_active());
}

#[test]
fn test_dispose_drops_armed_trigger() {
    let dispatcher = setup();
    let trigger = dispatcher.delayed_trigger("shutdown");
    let fired = fire_counter(&trigger);

    trigger.set_active(true);
    dispatcher.dispose();
    assert!(dispatcher.notify_idle().is_none());
    assert_eq!(*fired.lock(), 0);

    assert!(!trigger.is_active());
    assert_eq!(trigger.set_delay(Duration::from_secs(2)), Ok(()));
}
