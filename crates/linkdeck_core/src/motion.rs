//! Reduced-motion preference state
//!
//! [`MotionPreference`] is the single piece of shared mutable state in
//! linkdeck. It is created once by the application, written only by the
//! motion preference monitor and read by whichever component needs it at
//! decision time. Handles are cheap to clone and share the same value.
//!
//! ```rust
//! use linkdeck_core::MotionPreference;
//!
//! let motion = MotionPreference::new(false);
//! let seen = motion.clone();
//! let id = motion.on_change(move |reduced| assert_eq!(reduced, seen.current()));
//!
//! motion.set(true);
//! motion.remove_listener(id);
//! ```
//!
//! Handles are `Rc`-based: all reads and writes happen on the single UI
//! event loop, so no locking is involved.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

new_key_type! {
    /// Handle to a registered change listener
    pub struct MotionListenerId;
}

type MotionListener = Rc<dyn Fn(bool)>;

struct MotionInner {
    reduced: Cell<bool>,
    listeners: RefCell<SlotMap<MotionListenerId, MotionListener>>,
}

/// Shared reduced-motion flag with change notifications
#[derive(Clone)]
pub struct MotionPreference {
    inner: Rc<MotionInner>,
}

impl std::fmt::Debug for MotionPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionPreference")
            .field("reduced", &self.inner.reduced.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl Default for MotionPreference {
    fn default() -> Self {
        Self::new(false)
    }
}

impl MotionPreference {
    pub fn new(reduced: bool) -> Self {
        Self {
            inner: Rc::new(MotionInner {
                reduced: Cell::new(reduced),
                listeners: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// Whether reduced motion is currently requested
    pub fn current(&self) -> bool {
        self.inner.reduced.get()
    }

    /// Update the preference
    ///
    /// Listeners run only when the value actually changes. Returns `true`
    /// if it changed.
    pub fn set(&self, reduced: bool) -> bool {
        if self.inner.reduced.replace(reduced) == reduced {
            return false;
        }

        tracing::debug!(reduced, "motion preference changed");

        // Snapshot so listeners may register or remove listeners themselves
        let listeners: Vec<MotionListener> =
            self.inner.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(reduced);
        }
        true
    }

    /// Register a change listener
    ///
    /// The listener is not invoked for the current value; call
    /// [`current`](Self::current) once at setup for that.
    pub fn on_change<F>(&self, listener: F) -> MotionListenerId
    where
        F: Fn(bool) + 'static,
    {
        self.inner.listeners.borrow_mut().insert(Rc::new(listener))
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&self, id: MotionListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}
