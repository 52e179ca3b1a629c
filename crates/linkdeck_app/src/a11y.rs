//! Accessibility binder
//!
//! Makes every card reachable and operable from the keyboard, and exposes
//! the motion preference on the cards as `data-motion`.

use linkdeck_core::{EventType, Key, MotionListenerId, MotionPreference};
use linkdeck_dom::{Document, ElementId, EventTarget, ListenerOptions};

pub const MOTION_ATTRIBUTE: &str = "data-motion";

/// Keyboard and motion bindings for a set of cards
#[derive(Debug)]
pub struct AccessibilityBinder {
    motion: MotionPreference,
    motion_listener: MotionListenerId,
}

impl AccessibilityBinder {
    /// Bind focus, keyboard activation and the motion attribute on `cards`
    pub fn bind(document: &Document, cards: &[ElementId], motion: &MotionPreference) -> Self {
        for &card in cards {
            if !document.has_attribute(card, "tabindex") {
                set_attribute(document, card, "tabindex", "0");
            }
            set_attribute(document, card, "role", "link");

            let doc = document.downgrade();
            // Not passive: Space must cancel the page scroll
            document.add_event_listener(
                EventTarget::Element(card),
                EventType::KeyDown,
                ListenerOptions::default(),
                move |event| {
                    let Some(key) = event.key.as_ref().filter(|k| k.is_activation()) else {
                        return;
                    };
                    if *key == Key::Space {
                        event.prevent_default();
                    }
                    if let Some(doc) = doc.upgrade() {
                        doc.click(card);
                    }
                },
            );
        }

        mark_motion(document, cards, motion.current());
        let doc = document.downgrade();
        let targets = cards.to_vec();
        let motion_listener = motion.on_change(move |reduced| {
            if let Some(doc) = doc.upgrade() {
                mark_motion(&doc, &targets, reduced);
            }
        });

        tracing::debug!(cards = cards.len(), "accessibility bindings added");
        Self {
            motion: motion.clone(),
            motion_listener,
        }
    }
}

impl Drop for AccessibilityBinder {
    fn drop(&mut self) {
        self.motion.remove_listener(self.motion_listener);
    }
}

fn set_attribute(document: &Document, el: ElementId, name: &str, value: &str) {
    if let Err(err) = document.set_attribute(el, name, value) {
        tracing::warn!(attribute = name, error = %err, "failed to set card attribute");
    }
}

fn mark_motion(document: &Document, cards: &[ElementId], reduced: bool) {
    let value = if reduced { "reduced" } else { "full" };
    for &card in cards {
        set_attribute(document, card, MOTION_ATTRIBUTE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_dom::EventContext;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> (Document, ElementId, Rc<Cell<u32>>) {
        let doc = Document::new();
        let card = doc.create_element("a");
        doc.append_child(doc.body(), card).unwrap();
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        doc.add_event_listener(
            EventTarget::Element(card),
            EventType::Click,
            ListenerOptions::passive(),
            move |_| c.set(c.get() + 1),
        );
        (doc, card, clicks)
    }

    #[test]
    fn test_focusable_with_role() {
        let (doc, card, _) = setup();
        let other = doc.create_element("a");
        doc.set_attribute(other, "tabindex", "-1").unwrap();
        doc.append_child(doc.body(), other).unwrap();

        let _binder = AccessibilityBinder::bind(&doc, &[card, other], &MotionPreference::new(false));
        assert_eq!(doc.attribute(card, "tabindex").as_deref(), Some("0"));
        assert_eq!(doc.attribute(other, "tabindex").as_deref(), Some("-1"));
        assert_eq!(doc.attribute(card, "role").as_deref(), Some("link"));
    }

    #[test]
    fn test_activation_keys_click() {
        let (doc, card, clicks) = setup();
        let _binder = AccessibilityBinder::bind(&doc, &[card], &MotionPreference::new(false));

        let enter = doc.dispatch_event(&EventContext::key_down(card, Key::Enter));
        assert_eq!(clicks.get(), 1);
        assert!(!enter.default_prevented);

        let space = doc.dispatch_event(&EventContext::key_down(card, Key::Space));
        assert_eq!(clicks.get(), 2);
        assert!(space.default_prevented);

        doc.dispatch_event(&EventContext::key_down(card, Key::Tab));
        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn test_motion_attribute_follows_preference() {
        let (doc, card, _) = setup();
        let motion = MotionPreference::new(false);
        let binder = AccessibilityBinder::bind(&doc, &[card], &motion);
        assert_eq!(doc.attribute(card, MOTION_ATTRIBUTE).as_deref(), Some("full"));

        motion.set(true);
        assert_eq!(doc.attribute(card, MOTION_ATTRIBUTE).as_deref(), Some("reduced"));

        drop(binder);
        motion.set(false);
        assert_eq!(doc.attribute(card, MOTION_ATTRIBUTE).as_deref(), Some("reduced"));
        assert_eq!(motion.listener_count(), 0);
    }
}
