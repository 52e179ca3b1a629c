//! Motion preference monitor
//!
//! Mirrors the system reduced-motion setting into a [`MotionPreference`]
//! shared with the rest of the page, and keeps the `reduced-motion` marker
//! class on the document root in sync with it.

use linkdeck_core::{MotionListenerId, MotionPreference};
use linkdeck_dom::{Document, PreferenceListenerId, SystemPreferences};

/// Class set on the root element while reduced motion is active
pub const REDUCED_MOTION_CLASS: &str = "reduced-motion";

pub struct MotionPreferenceMonitor {
    preference: MotionPreference,
    system: SystemPreferences,
    subscription: Option<PreferenceListenerId>,
}

impl std::fmt::Debug for MotionPreferenceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionPreferenceMonitor")
            .field("reduced", &self.preference.current())
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}

impl MotionPreferenceMonitor {
    /// Read the system setting and follow its changes
    ///
    /// Without a reduced-motion query the preference stays `false`.
    pub fn start(document: &Document, system: &SystemPreferences) -> Self {
        let initial = match system.prefers_reduced_motion() {
            Some(reduced) => reduced,
            None => {
                tracing::debug!("reduced-motion query unavailable, assuming full motion");
                false
            }
        };

        let preference = MotionPreference::new(initial);
        set_marker(document, initial);

        let doc = document.clone();
        preference.on_change(move |reduced| set_marker(&doc, reduced));

        let relay = preference.clone();
        let subscription = system.add_change_listener(move |reduced| {
            relay.set(reduced);
        });

        tracing::debug!(reduced = initial, "motion preference monitor started");
        Self {
            preference,
            system: system.clone(),
            subscription,
        }
    }

    pub fn current(&self) -> bool {
        self.preference.current()
    }

    /// Register a change listener; never invoked synchronously
    pub fn on_change<F>(&self, listener: F) -> MotionListenerId
    where
        F: Fn(bool) + 'static,
    {
        self.preference.on_change(listener)
    }

    /// The shared preference handle
    pub fn preference(&self) -> MotionPreference {
        self.preference.clone()
    }
}

impl Drop for MotionPreferenceMonitor {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.system.remove_change_listener(id);
        }
    }
}

fn set_marker(document: &Document, reduced: bool) {
    if let Err(err) = document.toggle_class(document.root(), REDUCED_MOTION_CLASS, reduced) {
        tracing::warn!(error = %err, "failed to update reduced-motion marker");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_initial_reduced_sets_marker() {
        let doc = Document::new();
        let monitor = MotionPreferenceMonitor::start(&doc, &SystemPreferences::new(true));
        assert!(monitor.current());
        assert!(doc.has_class(doc.root(), REDUCED_MOTION_CLASS));
    }

    #[test]
    fn test_follows_system_changes() {
        let doc = Document::new();
        let system = SystemPreferences::new(false);
        let monitor = MotionPreferenceMonitor::start(&doc, &system);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        monitor.on_change(move |reduced| s.borrow_mut().push(reduced));
        assert!(seen.borrow().is_empty());
        assert!(!doc.has_class(doc.root(), REDUCED_MOTION_CLASS));

        system.set_reduced_motion(true);
        assert!(monitor.current());
        assert!(doc.has_class(doc.root(), REDUCED_MOTION_CLASS));

        system.set_reduced_motion(false);
        assert!(!doc.has_class(doc.root(), REDUCED_MOTION_CLASS));
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn test_unsupported_query_defaults_to_full_motion() {
        let doc = Document::new();
        let system = SystemPreferences::unsupported();
        let monitor = MotionPreferenceMonitor::start(&doc, &system);
        system.set_reduced_motion(true);
        assert!(!monitor.current());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let doc = Document::new();
        let system = SystemPreferences::new(false);
        let preference = {
            let monitor = MotionPreferenceMonitor::start(&doc, &system);
            monitor.preference()
        };
        system.set_reduced_motion(true);
        assert!(!preference.current());
    }
}
