//! Visibility monitoring
//!
//! [`VisibilityMonitor`] is the interface the animation controller observes
//! cards through. [`IntersectionObserver`] implements it on top of the
//! document viewport: it recomputes visibility after scroll, resize and
//! layout changes and reports asynchronously, on the next frame, whenever a
//! target crosses one of the configured thresholds.
//!
//! ```ignore
//! let options = ObserverOptions::new(50.0, vec![0.0, 0.1, 0.25]);
//! let monitor = IntersectionObserver::probe(&doc, &scheduler, options, Rc::new(|entries| {
//!     for entry in entries {
//!         println!("{:?} visible: {}", entry.target, entry.intersection_ratio);
//!     }
//! }));
//! if let Some(monitor) = monitor {
//!     monitor.observe(card);
//! }
//! ```
//!
//! A newly observed target is always reported once, whatever its state.

use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use linkdeck_animation::{next_frame, Scheduler, DEFAULT_FRAME_INTERVAL_MS};

use crate::document::{Document, ElementId, ViewportListenerId};

/// One visibility report for one target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    pub is_intersecting: bool,
    /// Visible fraction of the target, in `[0, 1]`
    pub intersection_ratio: f32,
    /// Virtual time of the computation
    pub time_ms: u64,
}

/// Callback receiving a batch of visibility reports
pub type VisibilityCallback = Rc<dyn Fn(&[IntersectionEntry])>;

/// Observer configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// Grows the viewport on both edges so targets report before they scroll in
    pub root_margin_px: f32,
    /// Visible fractions that trigger a report when crossed
    pub thresholds: Vec<f32>,
}

impl ObserverOptions {
    pub fn new(root_margin_px: f32, mut thresholds: Vec<f32>) -> Self {
        thresholds.retain(|t| (0.0..=1.0).contains(t));
        thresholds.sort_by(|a, b| a.total_cmp(b));
        thresholds.dedup();
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        Self {
            root_margin_px,
            thresholds,
        }
    }

    /// Index of the highest threshold reached, 0 when not intersecting
    fn bucket(&self, is_intersecting: bool, ratio: f32) -> usize {
        if !is_intersecting {
            return 0;
        }
        self.thresholds.iter().filter(|t| ratio >= **t).count()
    }
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self::new(0.0, vec![0.0])
    }
}

/// Asynchronous per-element visibility reporting
pub trait VisibilityMonitor {
    /// Start reporting on `target`
    fn observe(&self, target: ElementId);
    /// Stop reporting on `target`; no report for it is delivered afterwards
    fn unobserve(&self, target: ElementId);
    /// Stop reporting on every target
    fn disconnect(&self);
    /// Number of targets currently observed
    fn observed_count(&self) -> usize;
}

/// Last reported `(threshold bucket, is_intersecting)` of a target
type TargetState = (usize, bool);

struct ObserverInner {
    document: Document,
    scheduler: Scheduler,
    options: ObserverOptions,
    callback: VisibilityCallback,
    /// `None` until the first report for that target
    targets: RefCell<IndexMap<ElementId, Option<TargetState>>>,
    check_scheduled: Cell<bool>,
    viewport_listener: Cell<Option<ViewportListenerId>>,
}

/// Viewport-based [`VisibilityMonitor`]
#[derive(Clone)]
pub struct IntersectionObserver {
    inner: Rc<ObserverInner>,
}

impl std::fmt::Debug for IntersectionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionObserver")
            .field("options", &self.inner.options)
            .field("targets", &self.inner.targets.borrow().len())
            .finish()
    }
}

impl IntersectionObserver {
    /// Create an observer if the host supports visibility monitoring
    pub fn probe(
        document: &Document,
        scheduler: &Scheduler,
        options: ObserverOptions,
        callback: VisibilityCallback,
    ) -> Option<Self> {
        if !scheduler.capabilities().intersection_observer {
            tracing::debug!("intersection observer not available on this host");
            return None;
        }

        let inner = Rc::new(ObserverInner {
            document: document.clone(),
            scheduler: scheduler.clone(),
            options,
            callback,
            targets: RefCell::new(IndexMap::new()),
            check_scheduled: Cell::new(false),
            viewport_listener: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let listener = document.on_viewport_change(move || {
            if let Some(inner) = weak.upgrade() {
                schedule_check(&inner);
            }
        });
        inner.viewport_listener.set(Some(listener));

        Some(Self { inner })
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.inner.options
    }

    pub fn is_observing(&self, target: ElementId) -> bool {
        self.inner.targets.borrow().contains_key(&target)
    }
}

impl VisibilityMonitor for IntersectionObserver {
    fn observe(&self, target: ElementId) {
        let inserted = {
            let mut targets = self.inner.targets.borrow_mut();
            if targets.contains_key(&target) {
                false
            } else {
                targets.insert(target, None);
                true
            }
        };
        if inserted {
            schedule_check(&self.inner);
        }
    }

    fn unobserve(&self, target: ElementId) {
        self.inner.targets.borrow_mut().shift_remove(&target);
    }

    fn disconnect(&self) {
        self.inner.targets.borrow_mut().clear();
        if let Some(id) = self.inner.viewport_listener.take() {
            self.inner.document.remove_viewport_listener(id);
        }
    }

    fn observed_count(&self) -> usize {
        self.inner.targets.borrow().len()
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        if let Some(id) = self.viewport_listener.take() {
            self.document.remove_viewport_listener(id);
        }
    }
}

/// Coalesce recomputation into one check on the next frame
fn schedule_check(inner: &Rc<ObserverInner>) {
    if inner.check_scheduled.replace(true) {
        return;
    }
    let weak: Weak<ObserverInner> = Rc::downgrade(inner);
    next_frame(
        &inner.scheduler,
        DEFAULT_FRAME_INTERVAL_MS as u32,
        move || {
            if let Some(inner) = weak.upgrade() {
                inner.check_scheduled.set(false);
                run_check(&inner);
            }
        },
    );
}

fn run_check(inner: &ObserverInner) {
    let time_ms = inner.scheduler.now();
    let mut entries = Vec::new();
    {
        let mut targets = inner.targets.borrow_mut();
        for (target, last) in targets.iter_mut() {
            let Some((is_intersecting, ratio)) =
                inner.document.intersection(*target, inner.options.root_margin_px)
            else {
                continue;
            };

            let state = (inner.options.bucket(is_intersecting, ratio), is_intersecting);
            if *last != Some(state) {
                *last = Some(state);
                entries.push(IntersectionEntry {
                    target: *target,
                    is_intersecting,
                    intersection_ratio: ratio,
                    time_ms,
                });
            }
        }
    }

    if !entries.is_empty() {
        tracing::trace!(count = entries.len(), "delivering intersection entries");
        (inner.callback)(&entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LayoutBox;
    use linkdeck_core::Capabilities;

    struct Fixture {
        doc: Document,
        scheduler: Scheduler,
        cards: Vec<ElementId>,
        log: Rc<RefCell<Vec<IntersectionEntry>>>,
    }

    /// Viewport of 100px, cards of 40px every 60px starting at 0
    fn fixture(n: usize) -> Fixture {
        let doc = Document::new();
        doc.set_viewport_height(100.0);
        let cards = (0..n)
            .map(|i| {
                let card = doc.create_element("a");
                doc.append_child(doc.body(), card).unwrap();
                doc.set_layout(card, LayoutBox::new(i as f32 * 60.0, 40.0))
                    .unwrap();
                card
            })
            .collect();
        Fixture {
            doc,
            scheduler: Scheduler::new(Capabilities::full()),
            cards,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn observer(f: &Fixture, options: ObserverOptions) -> IntersectionObserver {
        let log = Rc::clone(&f.log);
        IntersectionObserver::probe(
            &f.doc,
            &f.scheduler,
            options,
            Rc::new(move |entries: &[IntersectionEntry]| log.borrow_mut().extend_from_slice(entries)),
        )
        .unwrap()
    }

    #[test]
    fn test_probe_without_capability() {
        let doc = Document::new();
        let scheduler = Scheduler::new(Capabilities::full().without_intersection_observer());
        let probed = IntersectionObserver::probe(
            &doc,
            &scheduler,
            ObserverOptions::default(),
            Rc::new(|_: &[IntersectionEntry]| {}),
        );
        assert!(probed.is_none());
    }

    #[test]
    fn test_initial_report_is_async_and_covers_every_target() {
        let f = fixture(4);
        let obs = observer(&f, ObserverOptions::default());
        for card in &f.cards {
            obs.observe(*card);
        }
        assert!(f.log.borrow().is_empty());

        f.scheduler.run_until_idle();
        let log = f.log.borrow();
        assert_eq!(log.len(), 4);
        // 0..40 and 60..100 visible, 120..160 and 180..220 not
        assert!(log[0].is_intersecting && log[0].intersection_ratio == 1.0);
        assert!(log[1].is_intersecting);
        assert!(!log[2].is_intersecting);
        assert!(!log[3].is_intersecting);
    }

    #[test]
    fn test_scroll_reports_threshold_crossings_only() {
        let f = fixture(3);
        let obs = observer(&f, ObserverOptions::new(0.0, vec![0.0, 0.5]));
        obs.observe(f.cards[2]);
        f.scheduler.run_until_idle();
        f.log.borrow_mut().clear();

        // 120..160 against 10..110: still outside
        f.doc.scroll_to(10.0);
        f.scheduler.run_until_idle();
        assert!(f.log.borrow().is_empty());

        // 30..130: 10px of 40 visible, crosses 0.0
        f.doc.scroll_to(30.0);
        f.scheduler.run_until_idle();
        assert_eq!(f.log.borrow().len(), 1);
        assert_eq!(f.log.borrow()[0].intersection_ratio, 0.25);

        // 35..135: 15px, same bucket
        f.doc.scroll_to(35.0);
        f.scheduler.run_until_idle();
        assert_eq!(f.log.borrow().len(), 1);

        // 60..160: fully visible, crosses 0.5
        f.doc.scroll_to(60.0);
        f.scheduler.run_until_idle();
        assert_eq!(f.log.borrow().len(), 2);
    }

    #[test]
    fn test_root_margin_reports_early() {
        let f = fixture(3);
        let obs = observer(&f, ObserverOptions::new(50.0, vec![0.0, 0.1, 0.25]));
        obs.observe(f.cards[2]);
        f.scheduler.run_until_idle();

        let log = f.log.borrow();
        assert_eq!(log.len(), 1);
        assert!(log[0].is_intersecting);
        assert_eq!(log[0].intersection_ratio, 0.75);
    }

    #[test]
    fn test_unobserve_stops_reports() {
        let f = fixture(3);
        let obs = observer(&f, ObserverOptions::default());
        obs.observe(f.cards[2]);
        obs.unobserve(f.cards[2]);
        assert_eq!(obs.observed_count(), 0);

        f.doc.scroll_to(200.0);
        f.scheduler.run_until_idle();
        assert!(f.log.borrow().is_empty());
    }

    #[test]
    fn test_checks_coalesce_per_frame() {
        let f = fixture(2);
        let obs = observer(&f, ObserverOptions::default());
        obs.observe(f.cards[0]);
        obs.observe(f.cards[1]);
        f.doc.scroll_to(5.0);
        f.doc.scroll_to(10.0);

        assert_eq!(f.scheduler.pending_tasks(), 1);
    }

    #[test]
    fn test_disconnect_releases_viewport_listener() {
        let f = fixture(1);
        let obs = observer(&f, ObserverOptions::default());
        obs.observe(f.cards[0]);
        obs.disconnect();
        f.scheduler.run_until_idle();

        f.doc.scroll_to(50.0);
        assert_eq!(f.scheduler.pending_tasks(), 0);
        assert!(f.log.borrow().is_empty());
    }

    #[test]
    fn test_options_normalize_thresholds() {
        let options = ObserverOptions::new(0.0, vec![0.25, 2.0, 0.0, 0.25]);
        assert_eq!(options.thresholds, vec![0.0, 0.25]);
        assert_eq!(options.bucket(true, 0.1), 1);
        assert_eq!(options.bucket(true, 0.3), 2);
        assert_eq!(options.bucket(false, 0.0), 0);
    }
}
