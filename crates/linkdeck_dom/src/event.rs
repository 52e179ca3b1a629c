//! Event listener storage and dispatch
//!
//! Listeners are registered per target and event type. Dispatch walks from
//! the target up through its ancestors for bubbling events, invoking
//! listeners in registration order at each step.
//!
//! ```text
//! document.add_event_listener(card, Click, options, |e| ...)
//!     ↓ stored as ListenerEntry
//! document.dispatch_event(ctx)
//!     ↓ target → parent → ... → html (bubbling events only)
//! callback(&EventContext)
//! ```
//!
//! A listener registered with [`ListenerOptions::passive`] can never cancel
//! the default action: `prevent_default` inside it is ignored with a warning.

use slotmap::new_key_type;
use std::cell::Cell;
use std::rc::Rc;

use linkdeck_core::{EventType, Key};

use crate::document::{Document, ElementId};

new_key_type! {
    /// Handle to a registered event listener
    pub struct ListenerId;
}

/// Callback for handling events
///
/// Uses Rc since the document is single-threaded.
pub type EventCallback = Rc<dyn Fn(&EventContext)>;

/// Where an event is dispatched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Element(ElementId),
}

/// Listener registration flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// The listener promises not to cancel the default action
    pub passive: bool,
    /// Remove the listener after its first invocation
    pub once: bool,
}

impl ListenerOptions {
    pub fn passive() -> Self {
        Self {
            passive: true,
            once: false,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

pub(crate) struct ListenerEntry {
    pub(crate) target: EventTarget,
    event_type: EventType,
    options: ListenerOptions,
    seq: u64,
    callback: EventCallback,
}

/// Context passed to event listeners
#[derive(Debug)]
pub struct EventContext {
    pub event_type: EventType,
    /// The element (or document) the event was dispatched to
    pub target: EventTarget,
    /// Key for `KeyDown` events
    pub key: Option<Key>,
    current_target: Cell<EventTarget>,
    in_passive_listener: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl EventContext {
    pub fn new(event_type: EventType, target: EventTarget) -> Self {
        Self {
            event_type,
            target,
            key: None,
            current_target: Cell::new(target),
            in_passive_listener: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Context for a key press on an element
    pub fn key_down(el: ElementId, key: Key) -> Self {
        let mut ctx = Self::new(EventType::KeyDown, EventTarget::Element(el));
        ctx.key = Some(key);
        ctx
    }

    /// The target whose listeners are currently running
    pub fn current_target(&self) -> EventTarget {
        self.current_target.get()
    }

    /// Cancel the default action, unless called from a passive listener
    pub fn prevent_default(&self) {
        if self.in_passive_listener.get() {
            tracing::warn!(
                event = %self.event_type,
                "prevent_default ignored inside passive event listener"
            );
            return;
        }
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Result of dispatching an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub listeners_invoked: usize,
    pub default_prevented: bool,
}

impl Document {
    /// Register a listener for `event_type` on `target`
    pub fn add_event_listener<F>(
        &self,
        target: EventTarget,
        event_type: EventType,
        options: ListenerOptions,
        callback: F,
    ) -> ListenerId
    where
        F: Fn(&EventContext) + 'static,
    {
        let seq = self.inner.next_listener_seq.get();
        self.inner.next_listener_seq.set(seq + 1);
        self.inner.listeners.borrow_mut().insert(ListenerEntry {
            target,
            event_type,
            options,
            seq,
            callback: Rc::new(callback),
        })
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id).is_some()
    }

    /// Number of listeners for `event_type` on `target`
    pub fn listener_count(&self, target: EventTarget, event_type: EventType) -> usize {
        self.inner
            .listeners
            .borrow()
            .values()
            .filter(|l| l.target == target && l.event_type == event_type)
            .count()
    }

    /// Whether every listener for `event_type` on `target` is passive
    pub fn listeners_are_passive(&self, target: EventTarget, event_type: EventType) -> bool {
        self.inner
            .listeners
            .borrow()
            .values()
            .filter(|l| l.target == target && l.event_type == event_type)
            .all(|l| l.options.passive)
    }

    /// Dispatch an event to its target (and ancestors if it bubbles)
    pub fn dispatch_event(&self, ctx: &EventContext) -> DispatchOutcome {
        let mut path = vec![ctx.target];
        if let EventTarget::Element(el) = ctx.target {
            if ctx.event_type.bubbles() {
                let mut current = self.parent(el);
                while let Some(parent) = current {
                    path.push(EventTarget::Element(parent));
                    current = self.parent(parent);
                }
            }
        }

        let mut invoked = 0;
        for step in path {
            ctx.current_target.set(step);

            let mut matching: Vec<(ListenerId, u64, ListenerOptions, EventCallback)> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|(_, l)| l.target == step && l.event_type == ctx.event_type)
                .map(|(id, l)| (id, l.seq, l.options, Rc::clone(&l.callback)))
                .collect();
            matching.sort_by_key(|(_, seq, _, _)| *seq);

            for (id, _, options, callback) in matching {
                if options.once {
                    self.remove_event_listener(id);
                }
                ctx.in_passive_listener.set(options.passive);
                callback(ctx);
                invoked += 1;
            }
        }
        ctx.in_passive_listener.set(false);

        DispatchOutcome {
            listeners_invoked: invoked,
            default_prevented: ctx.default_prevented(),
        }
    }

    /// Dispatch a click on `el`
    pub fn click(&self, el: ElementId) -> DispatchOutcome {
        self.dispatch_event(&EventContext::new(
            EventType::Click,
            EventTarget::Element(el),
        ))
    }
}
