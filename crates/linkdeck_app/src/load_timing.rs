//! Load timing observer
//!
//! Subscribes to paint and navigation entries and condenses them into
//! [`LoadMetrics`]. What gets logged depends on
//! [`ReportVerbosity`](linkdeck_core::ReportVerbosity).

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use linkdeck_core::ReportVerbosity;
use linkdeck_dom::{
    EntryType, PerformanceCallback, PerformanceEntry, PerformanceObserver, PerformanceTimeline,
};

pub const FIRST_PAINT: &str = "first-paint";
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Page load milestones, in ms since navigation start
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LoadMetrics {
    pub first_paint_ms: Option<f64>,
    pub first_contentful_paint_ms: Option<f64>,
    pub dom_content_loaded_ms: Option<f64>,
    pub load_complete_ms: Option<f64>,
}

impl LoadMetrics {
    /// Whether the navigation entry has arrived
    pub fn is_complete(&self) -> bool {
        self.load_complete_ms.is_some()
    }

    fn absorb(&mut self, entry: &PerformanceEntry) {
        match entry.entry_type {
            EntryType::Paint if entry.name == FIRST_PAINT => {
                self.first_paint_ms = Some(entry.start_time_ms);
            }
            EntryType::Paint if entry.name == FIRST_CONTENTFUL_PAINT => {
                self.first_contentful_paint_ms = Some(entry.start_time_ms);
            }
            EntryType::Paint => {}
            EntryType::Navigation => {
                if let Some(nav) = entry.navigation {
                    self.dom_content_loaded_ms = Some(nav.dom_content_loaded_ms);
                    self.load_complete_ms = Some(nav.load_event_end_ms);
                }
            }
        }
    }
}

struct TimingState {
    verbosity: ReportVerbosity,
    metrics: RefCell<LoadMetrics>,
    reported: Cell<bool>,
}

/// Collects load metrics from the performance timeline
pub struct LoadTimingObserver {
    state: Rc<TimingState>,
    observer: Option<PerformanceObserver>,
}

impl std::fmt::Debug for LoadTimingObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadTimingObserver")
            .field("active", &self.is_active())
            .field("metrics", &*self.state.metrics.borrow())
            .finish()
    }
}

impl LoadTimingObserver {
    /// Start observing; inactive when the host has no performance observer
    pub fn start(timeline: &PerformanceTimeline, verbosity: ReportVerbosity) -> Self {
        let state = Rc::new(TimingState {
            verbosity,
            metrics: RefCell::new(LoadMetrics::default()),
            reported: Cell::new(false),
        });

        let s = Rc::clone(&state);
        let callback: PerformanceCallback = Rc::new(move |entries: &[PerformanceEntry]| {
            on_entries(&s, entries);
        });
        let observer = PerformanceObserver::probe(
            timeline,
            &[EntryType::Paint, EntryType::Navigation],
            true,
            callback,
        );
        if observer.is_none() {
            tracing::debug!("load timing skipped, no performance observer");
        }

        Self { state, observer }
    }

    pub fn is_active(&self) -> bool {
        self.observer.as_ref().is_some_and(|o| o.is_connected())
    }

    pub fn metrics(&self) -> LoadMetrics {
        *self.state.metrics.borrow()
    }
}

fn on_entries(state: &TimingState, entries: &[PerformanceEntry]) {
    for entry in entries {
        if state.verbosity == ReportVerbosity::Detailed {
            tracing::debug!(
                name = %entry.name,
                entry_type = %entry.entry_type,
                start_ms = entry.start_time_ms,
                duration_ms = entry.duration_ms,
                "performance entry"
            );
        }
        state.metrics.borrow_mut().absorb(entry);
    }

    let metrics = *state.metrics.borrow();
    if !metrics.is_complete() || state.reported.replace(true) {
        return;
    }
    if state.verbosity != ReportVerbosity::Silent {
        tracing::info!(
            first_paint_ms = ?metrics.first_paint_ms,
            first_contentful_paint_ms = ?metrics.first_contentful_paint_ms,
            dom_content_loaded_ms = ?metrics.dom_content_loaded_ms,
            load_complete_ms = ?metrics.load_complete_ms,
            "page load timing"
        );
    }
}
