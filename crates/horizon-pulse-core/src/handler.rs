//! Handler capabilities that registries dispatch to.
//!
//! Registries hold handlers as `Arc<dyn PeriodicHandler>` or
//! `Arc<dyn IdleHandler>`. A handler's identity is the address of its `Arc`
//! allocation: removal and the reentrancy guard compare identities, never
//! values. Registering the same `Arc` twice yields two independent entries.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A callback invoked once per periodic tick.
pub trait PeriodicHandler: Send + Sync {
    /// Called on the UI thread once per tick.
    fn on_tick(&self);

    /// Name used to identify this handler in diagnostics.
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(type_name::<Self>())
    }
}

/// A callback invoked whenever the host reports an idle input queue.
pub trait IdleHandler: Send + Sync {
    /// Called on the UI thread once per idle pass.
    fn on_idle(&self);

    /// Name used to identify this handler in diagnostics.
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(type_name::<Self>())
    }
}

/// A boxed action run at most once during the next idle pass.
pub type OneShotAction = Box<dyn FnOnce() + Send + 'static>;

/// Closure adapter usable as either a periodic or an idle handler.
///
/// ```
/// use std::sync::Arc;
/// use horizon_pulse_core::{FnHandler, PeriodicHandler};
///
/// let handler = Arc::new(FnHandler::new("status-clock", || {}));
/// assert_eq!(handler.name(), "status-clock");
/// ```
pub struct FnHandler<F> {
    name: Cow<'static, str>,
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn() + Send + Sync + 'static,
{
    /// Create a named handler from a closure.
    pub fn new(name: impl Into<Cow<'static, str>>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }

    /// Create a named handler already wrapped in an `Arc`.
    pub fn shared(name: impl Into<Cow<'static, str>>, callback: F) -> Arc<Self> {
        Arc::new(Self::new(name, callback))
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> PeriodicHandler for FnHandler<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn on_tick(&self) {
        (self.callback)();
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&*self.name)
    }
}

impl<F> IdleHandler for FnHandler<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn on_idle(&self) {
        (self.callback)();
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&*self.name)
    }
}

/// Identity of a registered handler: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandlerKey(usize);

impl HandlerKey {
    pub(crate) fn of<H: ?Sized>(handler: &Arc<H>) -> Self {
        // Drop any vtable metadata so two `Arc<dyn _>` views of one allocation compare equal.
        Self(Arc::as_ptr(handler) as *const () as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl PeriodicHandler for Named {
        fn on_tick(&self) {}
    }

    #[test]
    fn test_default_name_is_type_name() {
        let handler = Named;
        assert!(PeriodicHandler::name(&handler).ends_with("Named"));
    }

    #[test]
    fn test_handler_key_identity() {
        let a: Arc<dyn PeriodicHandler> = FnHandler::shared("a", || {});
        let b: Arc<dyn PeriodicHandler> = FnHandler::shared("a", || {});
        let a2 = a.clone();

        assert_eq!(HandlerKey::of(&a), HandlerKey::of(&a2));
        assert_ne!(HandlerKey::of(&a), HandlerKey::of(&b));
    }

    #[test]
    fn test_handler_key_across_trait_views() {
        let handler = FnHandler::shared("both", || {});
        let as_tick: Arc<dyn PeriodicHandler> = handler.clone();
        let as_idle: Arc<dyn IdleHandler> = handler;
        assert_eq!(HandlerKey::of(&as_tick), HandlerKey::of(&as_idle));
    }
}
