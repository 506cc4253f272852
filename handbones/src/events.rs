use crate::BoneId;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandEvent {
    BoneAdded(BoneId),
    BoneRemoved(BoneId),
    /// A pose source republished data that differs from what it held before.
    PoseDataUpdated,
}

/// Receives [`HandEvent`]s synchronously from the component it subscribed to.
///
/// Listeners must not call back into the emitting component's mutating operations. They are
/// expected to record state (eg. set a flag) and return.
pub trait HandEventListener {
    fn on_event(&mut self, event: &HandEvent) -> Result<(), ListenerError>;
}

impl<F> HandEventListener for F
where
    F: FnMut(&HandEvent),
{
    fn on_event(&mut self, event: &HandEvent) -> Result<(), ListenerError> {
        self(event);
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionHandle(u64);

/// Fan-out of events to registered listeners in subscription order.
///
/// A listener that returns an error or panics is reported through `log` and skipped; delivery to
/// the remaining listeners continues and the emitter is unaffected.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<(SubscriptionHandle, Box<dyn HandEventListener>)>,
    next_handle: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L: HandEventListener + 'static>(&mut self, listener: L) -> SubscriptionHandle {
        self.subscribe_boxed(Box::new(listener))
    }

    pub fn subscribe_boxed(&mut self, listener: Box<dyn HandEventListener>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners.push((handle, listener));
        handle
    }

    /// Returns `false` if `handle` was not (or is no longer) subscribed.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn emit(&mut self, event: HandEvent) {
        for (handle, listener) in &mut self.listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::warn!("listener {handle:?} failed handling {event:?}: {err}");
                }
                Err(payload) => {
                    log::error!(
                        "listener {handle:?} panicked handling {event:?}: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
