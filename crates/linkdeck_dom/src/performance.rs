//! Performance timeline
//!
//! The host records paint and navigation entries on a [`PerformanceTimeline`];
//! a [`PerformanceObserver`] subscribes to entry types and receives them in
//! batches on a 0ms timer, never inside `record`.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use linkdeck_animation::Scheduler;

new_key_type! {
    struct ObserverKey;
}

/// Kind of performance entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    Paint,
    Navigation,
}

impl EntryType {
    pub fn name(self) -> &'static str {
        match self {
            EntryType::Paint => "paint",
            EntryType::Navigation => "navigation",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Document lifecycle milestones carried by a navigation entry
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NavigationTiming {
    pub dom_content_loaded_ms: f64,
    pub load_event_end_ms: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceEntry {
    /// `first-paint`, `first-contentful-paint`, or the document URL
    pub name: String,
    pub entry_type: EntryType,
    pub start_time_ms: f64,
    pub duration_ms: f64,
    /// Set on navigation entries only
    pub navigation: Option<NavigationTiming>,
}

impl PerformanceEntry {
    pub fn paint(name: impl Into<String>, start_time_ms: f64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Paint,
            start_time_ms,
            duration_ms: 0.0,
            navigation: None,
        }
    }

    pub fn navigation(name: impl Into<String>, timing: NavigationTiming) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Navigation,
            start_time_ms: 0.0,
            duration_ms: timing.load_event_end_ms,
            navigation: Some(timing),
        }
    }
}

/// Callback receiving a batch of entries
pub type PerformanceCallback = Rc<dyn Fn(&[PerformanceEntry])>;

struct ObserverRecord {
    types: SmallVec<[EntryType; 2]>,
    callback: PerformanceCallback,
    queued: Vec<PerformanceEntry>,
}

struct TimelineInner {
    supported: bool,
    scheduler: Scheduler,
    entries: RefCell<Vec<PerformanceEntry>>,
    observers: RefCell<SlotMap<ObserverKey, ObserverRecord>>,
    flush_scheduled: Cell<bool>,
}

/// Every entry the host recorded, plus the observers subscribed to them
#[derive(Clone)]
pub struct PerformanceTimeline {
    inner: Rc<TimelineInner>,
}

impl fmt::Debug for PerformanceTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceTimeline")
            .field("supported", &self.inner.supported)
            .field("entries", &self.inner.entries.borrow().len())
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

impl PerformanceTimeline {
    /// Observer support follows the scheduler's capabilities
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            inner: Rc::new(TimelineInner {
                supported: scheduler.capabilities().performance_observer,
                scheduler: scheduler.clone(),
                entries: RefCell::new(Vec::new()),
                observers: RefCell::new(SlotMap::with_key()),
                flush_scheduled: Cell::new(false),
            }),
        }
    }

    pub fn supports_observers(&self) -> bool {
        self.inner.supported
    }

    /// Append an entry and queue it for every observer of its type
    pub fn record(&self, entry: PerformanceEntry) {
        tracing::trace!(name = %entry.name, entry_type = %entry.entry_type, "performance entry");
        let queued = {
            let mut observers = self.inner.observers.borrow_mut();
            let mut queued = false;
            for record in observers.values_mut() {
                if record.types.contains(&entry.entry_type) {
                    record.queued.push(entry.clone());
                    queued = true;
                }
            }
            queued
        };
        self.inner.entries.borrow_mut().push(entry);
        if queued {
            schedule_flush(&self.inner);
        }
    }

    pub fn entries(&self) -> Vec<PerformanceEntry> {
        self.inner.entries.borrow().clone()
    }

    pub fn entries_by_type(&self, entry_type: EntryType) -> Vec<PerformanceEntry> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .cloned()
            .collect()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }
}

fn schedule_flush(inner: &Rc<TimelineInner>) {
    if inner.flush_scheduled.replace(true) {
        return;
    }
    let weak: Weak<TimelineInner> = Rc::downgrade(inner);
    inner.scheduler.set_timeout(0, move || {
        if let Some(inner) = weak.upgrade() {
            inner.flush_scheduled.set(false);
            flush(&inner);
        }
    });
}

fn flush(inner: &TimelineInner) {
    let batches: Vec<(PerformanceCallback, Vec<PerformanceEntry>)> = inner
        .observers
        .borrow_mut()
        .values_mut()
        .filter(|record| !record.queued.is_empty())
        .map(|record| (Rc::clone(&record.callback), std::mem::take(&mut record.queued)))
        .collect();

    for (callback, entries) in batches {
        callback(&entries);
    }
}

/// Subscription to entry types on a timeline, disconnected on drop
pub struct PerformanceObserver {
    timeline: PerformanceTimeline,
    key: Cell<Option<ObserverKey>>,
}

impl fmt::Debug for PerformanceObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceObserver")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl PerformanceObserver {
    /// Subscribe to `types`, or `None` if the host has no performance observer
    ///
    /// With `buffered`, entries recorded before the subscription are delivered
    /// in the first batch.
    pub fn probe(
        timeline: &PerformanceTimeline,
        types: &[EntryType],
        buffered: bool,
        callback: PerformanceCallback,
    ) -> Option<Self> {
        if !timeline.inner.supported {
            tracing::debug!("performance observer not available on this host");
            return None;
        }

        let types: SmallVec<[EntryType; 2]> = types.iter().copied().collect();
        let queued: Vec<PerformanceEntry> = if buffered {
            timeline
                .inner
                .entries
                .borrow()
                .iter()
                .filter(|e| types.contains(&e.entry_type))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let has_buffered = !queued.is_empty();

        let key = timeline.inner.observers.borrow_mut().insert(ObserverRecord {
            types,
            callback,
            queued,
        });
        if has_buffered {
            schedule_flush(&timeline.inner);
        }

        Some(Self {
            timeline: timeline.clone(),
            key: Cell::new(Some(key)),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.key.get().is_some()
    }

    /// Stop delivery, dropping anything still queued
    pub fn disconnect(&self) {
        if let Some(key) = self.key.take() {
            self.timeline.inner.observers.borrow_mut().remove(key);
        }
    }
}

impl Drop for PerformanceObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_core::Capabilities;

    fn collector() -> (Rc<RefCell<Vec<Vec<String>>>>, PerformanceCallback) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::clone(&batches);
        let callback: PerformanceCallback = Rc::new(move |entries: &[PerformanceEntry]| {
            b.borrow_mut()
                .push(entries.iter().map(|e| e.name.clone()).collect());
        });
        (batches, callback)
    }

    #[test]
    fn test_delivery_is_async_and_batched() {
        let scheduler = Scheduler::new(Capabilities::full());
        let timeline = PerformanceTimeline::new(&scheduler);
        let (batches, callback) = collector();
        let _observer =
            PerformanceObserver::probe(&timeline, &[EntryType::Paint], false, callback).unwrap();

        timeline.record(PerformanceEntry::paint("first-paint", 12.0));
        timeline.record(PerformanceEntry::paint("first-contentful-paint", 15.0));
        timeline.record(PerformanceEntry::navigation(
            "page",
            NavigationTiming {
                dom_content_loaded_ms: 20.0,
                load_event_end_ms: 40.0,
            },
        ));
        assert!(batches.borrow().is_empty());

        scheduler.run_until_idle();
        assert_eq!(
            *batches.borrow(),
            vec![vec!["first-paint".to_string(), "first-contentful-paint".to_string()]]
        );
        assert_eq!(timeline.entries().len(), 3);
    }

    #[test]
    fn test_buffered_entries() {
        let scheduler = Scheduler::new(Capabilities::full());
        let timeline = PerformanceTimeline::new(&scheduler);
        timeline.record(PerformanceEntry::paint("first-paint", 5.0));

        let (unbuffered, callback) = collector();
        let _a = PerformanceObserver::probe(&timeline, &[EntryType::Paint], false, callback).unwrap();
        let (buffered, callback) = collector();
        let _b = PerformanceObserver::probe(&timeline, &[EntryType::Paint], true, callback).unwrap();

        scheduler.run_until_idle();
        assert!(unbuffered.borrow().is_empty());
        assert_eq!(*buffered.borrow(), vec![vec!["first-paint".to_string()]]);
    }

    #[test]
    fn test_disconnect_drops_queued_entries() {
        let scheduler = Scheduler::new(Capabilities::full());
        let timeline = PerformanceTimeline::new(&scheduler);
        let (batches, callback) = collector();
        let observer =
            PerformanceObserver::probe(&timeline, &[EntryType::Paint], false, callback).unwrap();

        timeline.record(PerformanceEntry::paint("first-paint", 5.0));
        observer.disconnect();
        scheduler.run_until_idle();

        assert!(batches.borrow().is_empty());
        assert_eq!(timeline.observer_count(), 0);
    }

    #[test]
    fn test_probe_without_capability() {
        let scheduler = Scheduler::new(Capabilities::full().without_performance_observer());
        let timeline = PerformanceTimeline::new(&scheduler);
        let (_, callback) = collector();
        assert!(PerformanceObserver::probe(&timeline, &[EntryType::Paint], true, callback).is_none());

        timeline.record(PerformanceEntry::paint("first-paint", 5.0));
        assert_eq!(timeline.entries_by_type(EntryType::Paint).len(), 1);
        assert_eq!(scheduler.pending_tasks(), 0);
    }
}
