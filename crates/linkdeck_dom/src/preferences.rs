//! System preference queries
//!
//! Models the `(prefers-reduced-motion: reduce)` media query. The host sets
//! the value; the page reads it and subscribes to changes. On hosts without
//! the media query the value reads as `None` and no change is ever reported.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

new_key_type! {
    /// Handle to a preference change listener
    pub struct PreferenceListenerId;
}

struct PreferencesInner {
    supported: bool,
    reduced_motion: Cell<bool>,
    listeners: RefCell<SlotMap<PreferenceListenerId, Rc<dyn Fn(bool)>>>,
}

/// The host's accessibility preferences
#[derive(Clone)]
pub struct SystemPreferences {
    inner: Rc<PreferencesInner>,
}

impl std::fmt::Debug for SystemPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPreferences")
            .field("supported", &self.inner.supported)
            .field("reduced_motion", &self.inner.reduced_motion.get())
            .finish()
    }
}

impl SystemPreferences {
    /// Preferences with a supported reduced-motion query
    pub fn new(reduced_motion: bool) -> Self {
        Self::with_support(true, reduced_motion)
    }

    /// Preferences on a host without the reduced-motion query
    pub fn unsupported() -> Self {
        Self::with_support(false, false)
    }

    pub fn with_support(supported: bool, reduced_motion: bool) -> Self {
        Self {
            inner: Rc::new(PreferencesInner {
                supported,
                reduced_motion: Cell::new(reduced_motion),
                listeners: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// Current reduced-motion setting, `None` if the query is unsupported
    pub fn prefers_reduced_motion(&self) -> Option<bool> {
        self.inner
            .supported
            .then(|| self.inner.reduced_motion.get())
    }

    /// Subscribe to changes, `None` if the query is unsupported
    pub fn add_change_listener<F>(&self, listener: F) -> Option<PreferenceListenerId>
    where
        F: Fn(bool) + 'static,
    {
        if !self.inner.supported {
            return None;
        }
        Some(self.inner.listeners.borrow_mut().insert(Rc::new(listener)))
    }

    pub fn remove_change_listener(&self, id: PreferenceListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id).is_some()
    }

    /// Change the system setting (host side)
    pub fn set_reduced_motion(&self, reduced: bool) {
        if !self.inner.supported || self.inner.reduced_motion.replace(reduced) == reduced {
            return;
        }
        tracing::debug!(reduced, "system reduced-motion preference changed");

        let listeners: Vec<Rc<dyn Fn(bool)>> =
            self.inner.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(reduced);
        }
    }
}
