//! Generic publish/subscribe hook the engine fires lifecycle and
//! collision events through, in a fixed per-step order.

use std::collections::HashMap;
use std::fmt;

/// The fixed set of names the engine emits, in the order a single step
/// fires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    BeforeUpdate,
    BeforeSolve,
    CollisionStart,
    CollisionActive,
    CollisionEnd,
    AfterUpdate,
    SleepStart,
    SleepEnd,
}

/// Payload delivered to a subscriber. Collision events carry the affected
/// pair ids; lifecycle events carry only the step timestamp.
#[derive(Debug, Clone)]
pub enum Event {
    Step { timestamp: f64 },
    Collision { pair_ids: Vec<String> },
    Sleep { body_id: u64 },
}

type Handler = Box<dyn FnMut(&Event)>;

/// A per-name registry of subscriber callbacks, delivered in registration
/// order.
#[derive(Default)]
pub struct EventEmitter {
    handlers: HashMap<EventName, Vec<Handler>>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("names", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to `name`, returning its index for later
    /// removal via [`EventEmitter::off`].
    pub fn on(&mut self, name: EventName, handler: impl FnMut(&Event) + 'static) -> usize {
        let slot = self.handlers.entry(name).or_default();
        slot.push(Box::new(handler));
        slot.len() - 1
    }

    /// Removes a previously registered handler by the index [`on`]
    /// returned. A no-op if the index is out of range (already removed).
    pub fn off(&mut self, name: EventName, index: usize) {
        if let Some(slot) = self.handlers.get_mut(&name) {
            if index < slot.len() {
                slot.remove(index);
            }
        }
    }

    /// Delivers `event` to every subscriber of `name`, in registration
    /// order.
    pub fn emit(&mut self, name: EventName, event: &Event) {
        if let Some(slot) = self.handlers.get_mut(&name) {
            for handler in slot.iter_mut() {
                handler(event);
            }
        }
    }
}
