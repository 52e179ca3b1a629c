//! Simulated browser host
//!
//! Bundles the document, event loop, system preferences and performance
//! timeline a page runs against, and plays the browser's side of page
//! loading and user input.

use linkdeck_animation::Scheduler;
use linkdeck_core::{Capabilities, EventType, Key};
use linkdeck_dom::{
    DispatchOutcome, Document, ElementId, EventContext, EventTarget, NavigationTiming,
    PerformanceEntry, PerformanceTimeline, ReadyState, SystemPreferences,
};

use crate::load_timing::{FIRST_CONTENTFUL_PAINT, FIRST_PAINT};

/// Time from DOMContentLoaded to first paint
const FIRST_PAINT_DELAY_MS: u64 = 16;
/// Time from first paint to the end of the load event
const LOAD_DELAY_MS: u64 = 48;

const DEFAULT_URL: &str = "https://linkdeck.local/";

#[derive(Clone, Debug)]
pub struct Host {
    document: Document,
    scheduler: Scheduler,
    preferences: SystemPreferences,
    performance: PerformanceTimeline,
    capabilities: Capabilities,
    url: String,
}

impl Host {
    /// A host with full motion
    pub fn new(capabilities: Capabilities) -> Self {
        Self::with_reduced_motion(capabilities, false)
    }

    pub fn with_reduced_motion(capabilities: Capabilities, reduced_motion: bool) -> Self {
        let scheduler = Scheduler::new(capabilities);
        Self {
            document: Document::new(),
            preferences: SystemPreferences::with_support(
                capabilities.reduced_motion_query,
                reduced_motion,
            ),
            performance: PerformanceTimeline::new(&scheduler),
            scheduler,
            capabilities,
            url: DEFAULT_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn preferences(&self) -> &SystemPreferences {
        &self.preferences
    }

    pub fn performance(&self) -> &PerformanceTimeline {
        &self.performance
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Play a page load: DOMContentLoaded, first paint, then the load event
    ///
    /// Paint and navigation entries land on the performance timeline; the
    /// event loop runs while time passes.
    pub fn simulate_load(&self) {
        let start = self.scheduler.now();
        let elapsed = |now: u64| (now - start) as f64;

        self.document.set_ready_state(ReadyState::Interactive);
        let dom_content_loaded_ms = elapsed(self.scheduler.now());

        self.scheduler.advance(FIRST_PAINT_DELAY_MS);
        let paint_ms = elapsed(self.scheduler.now());
        self.performance
            .record(PerformanceEntry::paint(FIRST_PAINT, paint_ms));
        self.performance
            .record(PerformanceEntry::paint(FIRST_CONTENTFUL_PAINT, paint_ms));

        self.scheduler.advance(LOAD_DELAY_MS);
        self.document.set_ready_state(ReadyState::Complete);
        let load_event_end_ms = elapsed(self.scheduler.now());
        self.performance.record(PerformanceEntry::navigation(
            self.url.clone(),
            NavigationTiming {
                dom_content_loaded_ms,
                load_event_end_ms,
            },
        ));
        // Deliver what observers are waiting on without moving time
        self.scheduler.advance(0);

        tracing::debug!(load_event_end_ms, "page load simulated");
    }

    /// Scroll to `scroll_y` and run one frame
    pub fn scroll_to(&self, scroll_y: f32) {
        self.document.scroll_to(scroll_y);
        self.scheduler
            .advance(linkdeck_animation::DEFAULT_FRAME_INTERVAL_MS);
    }

    pub fn pointer_enter(&self, el: ElementId) -> DispatchOutcome {
        self.dispatch(EventType::PointerEnter, el)
    }

    pub fn pointer_leave(&self, el: ElementId) -> DispatchOutcome {
        self.dispatch(EventType::PointerLeave, el)
    }

    pub fn touch_start(&self, el: ElementId) -> DispatchOutcome {
        self.dispatch(EventType::TouchStart, el)
    }

    pub fn click(&self, el: ElementId) -> DispatchOutcome {
        self.document.click(el)
    }

    pub fn key_down(&self, el: ElementId, key: Key) -> DispatchOutcome {
        self.document
            .dispatch_event(&EventContext::key_down(el, key))
    }

    fn dispatch(&self, event_type: EventType, el: ElementId) -> DispatchOutcome {
        self.document
            .dispatch_event(&EventContext::new(event_type, EventTarget::Element(el)))
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(Capabilities::full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_dom::EntryType;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_simulate_load_sequence() {
        let host = Host::default();
        let events = Rc::new(RefCell::new(Vec::new()));
        for event_type in [EventType::DomContentLoaded, EventType::Load] {
            let e = Rc::clone(&events);
            let scheduler = host.scheduler().clone();
            host.document().add_event_listener(
                EventTarget::Document,
                event_type,
                Default::default(),
                move |ctx| e.borrow_mut().push((ctx.event_type, scheduler.now())),
            );
        }

        host.simulate_load();

        assert_eq!(
            *events.borrow(),
            vec![(EventType::DomContentLoaded, 0), (EventType::Load, 64)]
        );
        assert_eq!(host.document().ready_state(), ReadyState::Complete);
        assert_eq!(host.performance().entries_by_type(EntryType::Paint).len(), 2);

        let navigation = host.performance().entries_by_type(EntryType::Navigation);
        assert_eq!(
            navigation[0].navigation,
            Some(NavigationTiming {
                dom_content_loaded_ms: 0.0,
                load_event_end_ms: 64.0,
            })
        );
    }

    #[test]
    fn test_reduced_motion_query_follows_capabilities() {
        let host = Host::with_reduced_motion(Capabilities::minimal(), true);
        assert_eq!(host.preferences().prefers_reduced_motion(), None);

        let host = Host::with_reduced_motion(Capabilities::full(), true);
        assert_eq!(host.preferences().prefers_reduced_motion(), Some(true));
    }
}
