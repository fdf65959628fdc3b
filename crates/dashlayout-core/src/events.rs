//! Synchronous publish/subscribe channel between widget instances.
//!
//! One bus is created per dashboard and shared through the layout context.
//! Delivery is immediate and in registration order; a subscriber that panics
//! is logged and skipped so the others still hear the event.

use crate::breakpoint::Breakpoint;
use crate::config::ConfigSet;
use crate::identity::{InstanceId, WidgetId};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// Events exchanged between widget instances.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    /// The widget with this identity became the selected one.
    Select(WidgetId),
    /// Clear every selection.
    DeselectAll,
    /// A widget's config set changed.
    ConfigChanged {
        identity: WidgetId,
        /// Instance that made the change; it ignores its own event.
        origin: InstanceId,
        /// Breakpoint that was edited, `None` for a whole-set replacement.
        breakpoint: Option<Breakpoint>,
        configs: ConfigSet,
    },
}

impl LayoutEvent {
    /// Identity the event is about, if any.
    pub fn identity(&self) -> Option<&WidgetId> {
        match self {
            LayoutEvent::Select(identity) => Some(identity),
            LayoutEvent::ConfigChanged { identity, .. } => Some(identity),
            LayoutEvent::DeselectAll => None,
        }
    }
}

pub type Listener = Rc<dyn Fn(&LayoutEvent)>;

type Listeners = Rc<RefCell<Vec<Listener>>>;

/// The bus. Cheap to clone; clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Listeners,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned handle is dropped.
    pub fn subscribe(&self, listener: impl Fn(&LayoutEvent) + 'static) -> Subscription {
        let listener: Listener = Rc::new(listener);
        self.listeners.borrow_mut().push(listener.clone());
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            listener,
        }
    }

    /// Deliver `event` to every current subscriber before returning.
    ///
    /// Listeners may publish or (un)subscribe re-entrantly; they act on a
    /// snapshot taken when this call started.
    pub fn publish(&self, event: LayoutEvent) {
        let snapshot = self.listeners.borrow().clone();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                log::error!("Event listener panicked while handling {event:?}");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Keeps a listener registered; unsubscribes on drop.
pub struct Subscription {
    listeners: Weak<RefCell<Vec<Listener>>>,
    listener: Listener,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .retain(|l| !Rc::ptr_eq(l, &self.listener));
        }
    }
}
