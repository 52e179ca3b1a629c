//! Interaction logger
//!
//! Records the first click on each link. The duplicate check happens at
//! call time; the record itself is delivered later, when the event loop is
//! idle, so logging never competes with the click's navigation.

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use linkdeck_animation::{when_idle, Scheduler};
use linkdeck_core::EventType;
use linkdeck_dom::{Document, ElementId, EventTarget, ListenerOptions};

use crate::controller::resolve_card;

/// A logged link click
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClickRecord {
    pub url: String,
    pub label: String,
    /// Virtual time of the click
    pub time_ms: u64,
}

/// Destination for click records
pub trait ClickSink {
    fn record(&self, record: &ClickRecord);
}

/// Writes click records to the `tracing` log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ClickSink for TracingSink {
    fn record(&self, record: &ClickRecord) {
        tracing::info!(url = %record.url, label = %record.label, "link clicked");
    }
}

struct LoggerInner {
    scheduler: Scheduler,
    sink: Rc<dyn ClickSink>,
    seen: RefCell<FxHashSet<String>>,
    records: RefCell<Vec<ClickRecord>>,
}

/// Deduplicating click logger
#[derive(Clone)]
pub struct InteractionLogger {
    inner: Rc<LoggerInner>,
}

impl std::fmt::Debug for InteractionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionLogger")
            .field("seen", &self.inner.seen.borrow().len())
            .field("recorded", &self.inner.records.borrow().len())
            .finish()
    }
}

impl InteractionLogger {
    /// Logger writing to [`TracingSink`]
    pub fn new(scheduler: &Scheduler) -> Self {
        Self::with_sink(scheduler, Rc::new(TracingSink))
    }

    pub fn with_sink(scheduler: &Scheduler, sink: Rc<dyn ClickSink>) -> Self {
        Self {
            inner: Rc::new(LoggerInner {
                scheduler: scheduler.clone(),
                sink,
                seen: RefCell::new(FxHashSet::default()),
                records: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Log a click on `url`, unless that URL was already clicked
    ///
    /// Returns `true` if a record was scheduled.
    pub fn track_link_click(&self, url: &str, label: &str) -> bool {
        if !self.inner.seen.borrow_mut().insert(url.to_string()) {
            tracing::trace!(url, "duplicate click ignored");
            return false;
        }

        let record = ClickRecord {
            url: url.to_string(),
            label: label.to_string(),
            time_ms: self.inner.scheduler.now(),
        };
        let inner = Rc::clone(&self.inner);
        when_idle(&self.inner.scheduler, move || {
            inner.sink.record(&record);
            inner.records.borrow_mut().push(record);
        });
        true
    }

    /// Bind a passive click listener on each card
    ///
    /// URL and label are resolved from the card when it is clicked.
    pub fn bind_cards(&self, document: &Document, cards: &[ElementId], title_selector: &str) {
        for &card in cards {
            let logger = self.clone();
            let doc = document.downgrade();
            let title_selector = title_selector.to_string();
            document.add_event_listener(
                EventTarget::Element(card),
                EventType::Click,
                ListenerOptions::passive(),
                move |_| {
                    let Some(doc) = doc.upgrade() else {
                        return;
                    };
                    let (url, label) = resolve_card(&doc, card, &title_selector);
                    if url.is_empty() {
                        tracing::warn!("clicked card has no href");
                        return;
                    }
                    logger.track_link_click(&url, &label);
                },
            );
        }
        tracing::debug!(cards = cards.len(), "click logging bound");
    }

    /// Records delivered so far, in click order
    pub fn records(&self) -> Vec<ClickRecord> {
        self.inner.records.borrow().clone()
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.inner.seen.borrow().contains(url)
    }
}
