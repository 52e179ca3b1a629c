//! Application shell
//!
//! Wires every component to a [`Host`] once the document structure is
//! parsed. Start order:
//!
//! 1. load timing observation
//! 2. motion preference monitor
//! 3. entrance animations
//! 4. hover effects
//! 5. click logging
//! 6. accessibility bindings

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use linkdeck_core::{DeckConfig, EventType};
use linkdeck_dom::{ElementId, EventTarget, ListenerId, ListenerOptions, ReadyState};

use crate::a11y::AccessibilityBinder;
use crate::controller::Controller;
use crate::error::Result;
use crate::host::Host;
use crate::load_timing::{LoadMetrics, LoadTimingObserver};
use crate::logger::{ClickSink, InteractionLogger, TracingSink};
use crate::motion::MotionPreferenceMonitor;
use crate::report::{CardReport, PageReport};

/// Components created by the start sequence
struct Components {
    load_timing: LoadTimingObserver,
    motion: MotionPreferenceMonitor,
    controller: Controller,
    logger: InteractionLogger,
    _a11y: AccessibilityBinder,
}

struct AppInner {
    host: Host,
    config: DeckConfig,
    sink: Rc<dyn ClickSink>,
    components: RefCell<Option<Components>>,
    start_listener: Cell<Option<ListenerId>>,
}

/// The enhancement layer of one page
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("host", &self.inner.host)
            .field("started", &self.is_started())
            .finish()
    }
}

impl App {
    /// Validate `config` and prepare an app logging clicks to `tracing`
    pub fn new(host: &Host, config: DeckConfig) -> Result<Self> {
        Self::with_click_sink(host, config, Rc::new(TracingSink))
    }

    pub fn with_click_sink(host: &Host, config: DeckConfig, sink: Rc<dyn ClickSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Rc::new(AppInner {
                host: host.clone(),
                config,
                sink,
                components: RefCell::new(None),
                start_listener: Cell::new(None),
            }),
        })
    }

    /// Run the start sequence on DOMContentLoaded
    ///
    /// Runs immediately if the document is already interactive.
    pub fn start(&self) {
        let document = self.inner.host.document();
        if document.ready_state() >= ReadyState::Interactive {
            run_start_sequence(&self.inner);
            return;
        }
        if self.inner.start_listener.get().is_some() {
            return;
        }

        let weak: Weak<AppInner> = Rc::downgrade(&self.inner);
        let id = document.add_event_listener(
            EventTarget::Document,
            EventType::DomContentLoaded,
            ListenerOptions::passive().once(),
            move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.start_listener.set(None);
                    run_start_sequence(&inner);
                }
            },
        );
        self.inner.start_listener.set(Some(id));
        tracing::debug!("start deferred until DOMContentLoaded");
    }

    pub fn is_started(&self) -> bool {
        self.inner.components.borrow().is_some()
    }

    pub fn host(&self) -> &Host {
        &self.inner.host
    }

    pub fn config(&self) -> &DeckConfig {
        &self.inner.config
    }

    pub fn controller(&self) -> Option<Controller> {
        self.inner
            .components
            .borrow()
            .as_ref()
            .map(|c| c.controller.clone())
    }

    pub fn logger(&self) -> Option<InteractionLogger> {
        self.inner
            .components
            .borrow()
            .as_ref()
            .map(|c| c.logger.clone())
    }

    pub fn reduced_motion(&self) -> bool {
        self.inner
            .components
            .borrow()
            .as_ref()
            .is_some_and(|c| c.motion.current())
    }

    pub fn load_metrics(&self) -> LoadMetrics {
        self.inner
            .components
            .borrow()
            .as_ref()
            .map(|c| c.load_timing.metrics())
            .unwrap_or_default()
    }

    /// Snapshot of every card, click and load metric
    pub fn report(&self) -> PageReport {
        let host = &self.inner.host;
        let document = host.document();
        let components = self.inner.components.borrow();

        let (cards, clicks, pending_registrations) = match components.as_ref() {
            Some(c) => {
                let cards = c
                    .controller
                    .cards()
                    .iter()
                    .map(|card| CardReport {
                        index: card.index,
                        url: card.url.clone(),
                        label: card.label.clone(),
                        state: card.state(),
                        hovered: card.is_hovered(),
                        timing: card
                            .applied_timing()
                            .unwrap_or_else(|| c.controller.entrance_timing(card.index)),
                        opacity: document.style(card.element, "opacity"),
                        transform: document.style(card.element, "transform"),
                        will_change: document.style(card.element, "will-change"),
                    })
                    .collect();
                (cards, c.logger.records(), c.controller.registration_count())
            }
            None => (Vec::new(), Vec::new(), 0),
        };

        PageReport {
            time_ms: host.scheduler().now(),
            reduced_motion: components.as_ref().is_some_and(|c| c.motion.current()),
            pending_registrations,
            cards,
            clicks,
            load: components
                .as_ref()
                .map(|c| c.load_timing.metrics())
                .unwrap_or_default(),
        }
    }
}

fn run_start_sequence(inner: &AppInner) {
    if inner.components.borrow().is_some() {
        return;
    }
    let host = &inner.host;
    let config = &inner.config;
    let document = host.document();

    let load_timing = LoadTimingObserver::start(host.performance(), config.reporting.verbosity);
    let motion = MotionPreferenceMonitor::start(document, host.preferences());

    let controller = Controller::new(document, host.scheduler(), motion.preference(), config);
    controller.init_entrance_animations();
    controller.init_hover_effects();

    let cards: Vec<ElementId> = controller.cards().iter().map(|c| c.element).collect();
    let logger = InteractionLogger::with_sink(host.scheduler(), Rc::clone(&inner.sink));
    logger.bind_cards(document, &cards, &config.selectors.title);

    let a11y = AccessibilityBinder::bind(document, &cards, &motion.preference());

    tracing::info!(
        cards = cards.len(),
        reduced_motion = motion.current(),
        "linkdeck started"
    );
    *inner.components.borrow_mut() = Some(Components {
        load_timing,
        motion,
        controller,
        logger,
        _a11y: a11y,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CardState;
    use crate::error::AppError;
    use crate::manifest::PageManifest;
    use linkdeck_core::{Capabilities, ConfigError};

    const PAGE: &str = r#"
title = "Test"
viewport_height = 300.0

[[links]]
url = "https://x.example/a"
label = "A"

[[links]]
url = "https://x.example/b"
label = "B"
"#;

    fn page(host: &Host) {
        PageManifest::from_toml_str(PAGE)
            .unwrap()
            .build(host.document())
            .unwrap();
    }

    #[test]
    fn test_start_waits_for_dom_content_loaded() {
        let host = Host::default();
        page(&host);
        let app = App::new(&host, DeckConfig::default()).unwrap();
        app.start();
        app.start();
        assert!(!app.is_started());
        assert_eq!(
            host.document()
                .listener_count(EventTarget::Document, EventType::DomContentLoaded),
            1
        );

        host.simulate_load();
        assert!(app.is_started());
        assert_eq!(app.controller().unwrap().cards().len(), 2);
        assert!(app.load_metrics().is_complete());
    }

    #[test]
    fn test_start_runs_immediately_when_interactive() {
        let host = Host::default();
        page(&host);
        host.document().set_ready_state(ReadyState::Interactive);
        let app = App::new(&host, DeckConfig::default()).unwrap();
        app.start();
        assert!(app.is_started());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DeckConfig::default();
        config.observer.thresholds.clear();
        let err = App::new(&Host::default(), config).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_reduced_motion_host() {
        let host = Host::with_reduced_motion(Capabilities::full(), true);
        page(&host);
        let app = App::new(&host, DeckConfig::default()).unwrap();
        app.start();
        host.simulate_load();

        let report = app.report();
        assert!(report.reduced_motion);
        assert_eq!(report.pending_registrations, 0);
        assert!(report.cards.iter().all(|c| c.state == CardState::Settled));
        assert!(report.cards.iter().all(|c| c.timing.delay_ms == 0));
    }
}
