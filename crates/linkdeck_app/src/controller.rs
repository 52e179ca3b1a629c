//! Animation & interaction controller
//!
//! Owns the link cards found on the page and drives their presentation:
//!
//! - **Entrance**: cards start hidden and offset; the first time a card
//!   scrolls into view it fades and slides in with a per-index stagger.
//! - **Hover / touch**: pointer and touch listeners set the `will-change`
//!   rendering hint while a card is interacted with.
//!
//! # Card lifecycle
//!
//! ```text
//! Pending ──(visible)──▶ Animating ──(delay + duration + grace)──▶ Settled
//!    └─────────────(reduced motion or no visibility monitor)─────────▲
//! ```
//!
//! A card leaves `Pending` at most once. Every DOM lookup failure is logged
//! and skipped; nothing here is fatal.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use linkdeck_animation::{next_frame, throttle, Easing, Scheduler, TransitionSpec};
use linkdeck_core::{AnimationConfig, DeckConfig, EventType, MotionPreference};
use linkdeck_dom::{
    query, Document, ElementId, EventTarget, IntersectionEntry, IntersectionObserver,
    ListenerOptions, ObserverOptions, VisibilityCallback, VisibilityMonitor,
};

/// Transform of a card at rest
pub const SETTLED_TRANSFORM: &str = "translateY(0) scale(1)";
/// Rendering hint while a card animates in
pub const ENTRANCE_HINT: &str = "opacity, transform";
/// Rendering hint while a card is hovered or touched
pub const HOVER_HINT: &str = "opacity, transform, filter";
/// Label used when a card has no title
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Creates the visibility monitor used for entrance animations
///
/// Returns `None` when the host cannot monitor visibility.
pub type MonitorFactory =
    Box<dyn Fn(ObserverOptions, VisibilityCallback) -> Option<Rc<dyn VisibilityMonitor>>>;

/// Animation state of a card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    Pending,
    Animating,
    Settled,
}

impl CardState {
    pub fn name(self) -> &'static str {
        match self {
            CardState::Pending => "pending",
            CardState::Animating => "animating",
            CardState::Settled => "settled",
        }
    }
}

impl std::fmt::Display for CardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Entrance delay and duration of one card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EntranceTiming {
    pub delay_ms: u32,
    pub duration_ms: u32,
}

/// Entrance timing for the card at `index`
///
/// The stagger delay is dropped when `reduced` is set.
pub fn entrance_timing(config: &AnimationConfig, index: usize, reduced: bool) -> EntranceTiming {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    let delay_ms = if reduced {
        0
    } else {
        config.stagger_delay_ms.saturating_mul(index)
    };
    EntranceTiming {
        delay_ms,
        duration_ms: config
            .base_duration_ms
            .saturating_add(config.duration_increment_ms.saturating_mul(index)),
    }
}

/// A link card on the page
#[derive(Debug)]
pub struct Card {
    pub index: usize,
    pub element: ElementId,
    pub url: String,
    pub label: String,
    state: Cell<CardState>,
    hovered: Cell<bool>,
    applied_timing: Cell<Option<EntranceTiming>>,
}

impl Card {
    pub fn state(&self) -> CardState {
        self.state.get()
    }

    /// Timing the entrance animation ran with, `None` if it never ran
    pub fn applied_timing(&self) -> Option<EntranceTiming> {
        self.applied_timing.get()
    }

    /// Whether a pointer or touch is currently on the card
    pub fn is_hovered(&self) -> bool {
        self.hovered.get()
    }
}

/// URL and label of a card element
///
/// The label is the trimmed text of the title element, or `"Unknown"`.
pub fn resolve_card(document: &Document, element: ElementId, title_selector: &str) -> (String, String) {
    let url = document.attribute(element, "href").unwrap_or_default();
    let label = query::query_one(document, title_selector, Some(element))
        .and_then(|title| document.text_content(title))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
    (url, label)
}

struct ControllerInner {
    document: Document,
    scheduler: Scheduler,
    motion: MotionPreference,
    config: DeckConfig,
    opacity_easing: Easing,
    transform_easing: Easing,
    cards: Vec<Card>,
    by_element: FxHashMap<ElementId, usize>,
    monitor_factory: MonitorFactory,
    monitor: RefCell<Option<Rc<dyn VisibilityMonitor>>>,
    registered: RefCell<FxHashSet<ElementId>>,
    entrance_initialized: Cell<bool>,
    hover_initialized: Cell<bool>,
}

/// Drives entrance animations and hover feedback for the page's cards
#[derive(Clone)]
pub struct Controller {
    inner: Rc<ControllerInner>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("cards", &self.inner.cards.len())
            .field("registrations", &self.registration_count())
            .finish()
    }
}

impl Controller {
    /// Find the cards in `document`, observing them with an [`IntersectionObserver`]
    pub fn new(
        document: &Document,
        scheduler: &Scheduler,
        motion: MotionPreference,
        config: &DeckConfig,
    ) -> Self {
        let doc = document.clone();
        let sched = scheduler.clone();
        let factory: MonitorFactory = Box::new(move |options, callback| {
            IntersectionObserver::probe(&doc, &sched, options, callback)
                .map(|observer| Rc::new(observer) as Rc<dyn VisibilityMonitor>)
        });
        Self::with_monitor_factory(document, scheduler, motion, config, factory)
    }

    /// Like [`new`](Self::new), with a custom visibility monitor
    pub fn with_monitor_factory(
        document: &Document,
        scheduler: &Scheduler,
        motion: MotionPreference,
        config: &DeckConfig,
        monitor_factory: MonitorFactory,
    ) -> Self {
        let cards: Vec<Card> = query::query_all(document, &config.selectors.card, None)
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                let (url, label) = resolve_card(document, element, &config.selectors.title);
                Card {
                    index,
                    element,
                    url,
                    label,
                    state: Cell::new(CardState::Pending),
                    hovered: Cell::new(false),
                    applied_timing: Cell::new(None),
                }
            })
            .collect();
        let by_element = cards.iter().map(|c| (c.element, c.index)).collect();

        tracing::debug!(cards = cards.len(), selector = %config.selectors.card, "controller created");

        Self {
            inner: Rc::new(ControllerInner {
                document: document.clone(),
                scheduler: scheduler.clone(),
                motion,
                opacity_easing: parse_easing(
                    "animation.opacity_easing",
                    &config.animation.opacity_easing,
                    Easing::STANDARD,
                ),
                transform_easing: parse_easing(
                    "animation.transform_easing",
                    &config.animation.transform_easing,
                    Easing::OVERSHOOT,
                ),
                config: config.clone(),
                cards,
                by_element,
                monitor_factory,
                monitor: RefCell::new(None),
                registered: RefCell::new(FxHashSet::default()),
                entrance_initialized: Cell::new(false),
                hover_initialized: Cell::new(false),
            }),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.inner.cards
    }

    pub fn card_state(&self, index: usize) -> Option<CardState> {
        self.inner.cards.get(index).map(Card::state)
    }

    pub fn card_index(&self, element: ElementId) -> Option<usize> {
        self.inner.by_element.get(&element).copied()
    }

    /// Cards still waiting to become visible
    pub fn registration_count(&self) -> usize {
        self.inner.registered.borrow().len()
    }

    /// Entrance timing of the card at `index` under the current preference
    pub fn entrance_timing(&self, index: usize) -> EntranceTiming {
        entrance_timing(&self.inner.config.animation, index, self.inner.motion.current())
    }

    /// Hide every card and animate each in the first time it becomes visible
    ///
    /// With reduced motion, or without a visibility monitor, cards are shown
    /// immediately instead. Only the first call has an effect.
    pub fn init_entrance_animations(&self) {
        let inner = &self.inner;
        if inner.entrance_initialized.replace(true) {
            return;
        }
        if inner.cards.is_empty() {
            tracing::debug!("no cards to animate");
            return;
        }
        if inner.motion.current() {
            tracing::debug!("reduced motion, showing cards without entrance animation");
            settle_all(inner);
            return;
        }

        let options = ObserverOptions::new(
            inner.config.observer.root_margin_px,
            inner.config.observer.thresholds.clone(),
        );
        let weak: Weak<ControllerInner> = Rc::downgrade(inner);
        let callback: VisibilityCallback = Rc::new(move |entries: &[IntersectionEntry]| {
            if let Some(inner) = weak.upgrade() {
                on_visibility(&inner, entries);
            }
        });
        let Some(monitor) = (inner.monitor_factory)(options, callback) else {
            tracing::warn!("visibility monitoring unavailable, showing cards without entrance animation");
            settle_all(inner);
            return;
        };

        let offset = format!(
            "translateY({}px) scale(0.98)",
            inner.config.animation.entrance_offset_px
        );
        for card in &inner.cards {
            apply_styles(
                &inner.document,
                card.element,
                &[
                    ("opacity", "0"),
                    ("transform", offset.as_str()),
                    ("will-change", ENTRANCE_HINT),
                ],
            );
        }
        inner
            .registered
            .borrow_mut()
            .extend(inner.cards.iter().map(|c| c.element));
        *inner.monitor.borrow_mut() = Some(Rc::clone(&monitor));
        for card in &inner.cards {
            monitor.observe(card.element);
        }

        tracing::debug!(cards = inner.cards.len(), "entrance animations armed");
    }

    /// Run the entrance animation of the card at `index`
    ///
    /// Returns `false` if the card is unknown or has already left `Pending`.
    pub fn animate_card(&self, index: usize) -> bool {
        animate(&self.inner, index)
    }

    /// Bind pointer and touch feedback on every card. Only the first call
    /// has an effect.
    pub fn init_hover_effects(&self) {
        let inner = &self.inner;
        if inner.hover_initialized.replace(true) {
            return;
        }
        let throttle_ms = inner.config.hover.throttle_ms;

        for card in &inner.cards {
            let index = card.index;
            let target = EventTarget::Element(card.element);

            let weak = Rc::downgrade(inner);
            let enter = throttle(&inner.scheduler, throttle_ms, move |index: usize| {
                if let Some(inner) = weak.upgrade() {
                    hover_enter(&inner, index);
                }
            });
            inner.document.add_event_listener(
                target,
                EventType::PointerEnter,
                ListenerOptions::passive(),
                move |_| {
                    enter.call(index);
                },
            );

            let weak = Rc::downgrade(inner);
            let leave = throttle(&inner.scheduler, throttle_ms, move |index: usize| {
                if let Some(inner) = weak.upgrade() {
                    hover_leave(&inner, index);
                }
            });
            inner.document.add_event_listener(
                target,
                EventType::PointerLeave,
                ListenerOptions::passive(),
                move |_| {
                    leave.call(index);
                },
            );

            let weak = Rc::downgrade(inner);
            inner.document.add_event_listener(
                target,
                EventType::TouchStart,
                ListenerOptions::passive(),
                move |_| {
                    if let Some(inner) = weak.upgrade() {
                        touch_start(&inner, index);
                    }
                },
            );
        }

        tracing::debug!(cards = inner.cards.len(), "hover effects bound");
    }
}

fn parse_easing(field: &'static str, value: &str, fallback: Easing) -> Easing {
    value.parse().unwrap_or_else(|err| {
        tracing::warn!(field, error = %err, "invalid easing, using default");
        fallback
    })
}

fn apply_styles(document: &Document, element: ElementId, styles: &[(&str, &str)]) {
    for (property, value) in styles {
        if let Err(err) = document.set_style(element, property, *value) {
            tracing::warn!(property, error = %err, "failed to update card style");
            return;
        }
    }
}

fn settle_all(inner: &ControllerInner) {
    for card in &inner.cards {
        apply_styles(
            &inner.document,
            card.element,
            &[("opacity", "1"), ("transform", SETTLED_TRANSFORM)],
        );
        card.state.set(CardState::Settled);
    }
}

fn on_visibility(inner: &Rc<ControllerInner>, entries: &[IntersectionEntry]) {
    for entry in entries {
        if !entry.is_intersecting || entry.intersection_ratio <= 0.0 {
            continue;
        }
        if !inner.registered.borrow().contains(&entry.target) {
            continue;
        }
        if let Some(&index) = inner.by_element.get(&entry.target) {
            animate(inner, index);
        }
    }
}

/// Drop the card's visibility registration, if it still has one
fn unregister(inner: &ControllerInner, element: ElementId) {
    if !inner.registered.borrow_mut().remove(&element) {
        return;
    }
    let monitor = inner.monitor.borrow().clone();
    if let Some(monitor) = monitor {
        monitor.unobserve(element);
    }
}

fn animate(inner: &Rc<ControllerInner>, index: usize) -> bool {
    let Some(card) = inner.cards.get(index) else {
        tracing::warn!(index, "no card at index");
        return false;
    };
    if card.state.get() != CardState::Pending {
        return false;
    }
    card.state.set(CardState::Animating);
    unregister(inner, card.element);

    let timing = entrance_timing(&inner.config.animation, index, inner.motion.current());
    card.applied_timing.set(Some(timing));
    let transition = TransitionSpec::new()
        .with("opacity", timing.duration_ms, inner.opacity_easing, timing.delay_ms)
        .with("transform", timing.duration_ms, inner.transform_easing, timing.delay_ms)
        .to_string();

    let element = card.element;
    let frame_inner = Rc::clone(inner);
    next_frame(
        &inner.scheduler,
        inner.config.scheduling.frame_fallback_ms,
        move || {
            apply_styles(
                &frame_inner.document,
                element,
                &[
                    ("transition", transition.as_str()),
                    ("opacity", "1"),
                    ("transform", SETTLED_TRANSFORM),
                ],
            );
        },
    );

    let cleanup_after = timing
        .delay_ms
        .saturating_add(timing.duration_ms)
        .saturating_add(inner.config.animation.cleanup_grace_ms);
    let cleanup_inner = Rc::clone(inner);
    inner.scheduler.set_timeout(cleanup_after, move || {
        let card = &cleanup_inner.cards[index];
        apply_styles(&cleanup_inner.document, card.element, &[("will-change", "auto")]);
        card.state.set(CardState::Settled);
        tracing::trace!(index, "card settled");
    });

    tracing::debug!(
        index,
        delay_ms = timing.delay_ms,
        duration_ms = timing.duration_ms,
        "card entrance started"
    );
    true
}

fn hover_enter(inner: &ControllerInner, index: usize) {
    let Some(card) = inner.cards.get(index) else {
        return;
    };
    apply_styles(&inner.document, card.element, &[("will-change", HOVER_HINT)]);
    if !inner.motion.current() && index > 0 {
        let delay = format!(
            "{}ms",
            inner.config.hover.stagger_ms.saturating_mul(index as u32)
        );
        apply_styles(&inner.document, card.element, &[("transition-delay", delay.as_str())]);
    }
    card.hovered.set(true);
}

fn hover_leave(inner: &Rc<ControllerInner>, index: usize) {
    let weak = Rc::downgrade(inner);
    inner
        .scheduler
        .set_timeout(inner.config.hover.settle_delay_ms, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some(card) = inner.cards.get(index) else {
                return;
            };
            apply_styles(
                &inner.document,
                card.element,
                &[("will-change", "auto"), ("transition-delay", "0ms")],
            );
            card.hovered.set(false);
        });
}

fn touch_start(inner: &ControllerInner, index: usize) {
    let Some(card) = inner.cards.get(index) else {
        return;
    };
    if !inner.motion.current() {
        apply_styles(&inner.document, card.element, &[("will-change", HOVER_HINT)]);
    }
    card.hovered.set(true);
}
