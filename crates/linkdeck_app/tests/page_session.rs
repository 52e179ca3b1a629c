//! End-to-end page sessions against the simulated host

use std::cell::RefCell;
use std::rc::Rc;

use linkdeck_app::{App, CardState, ClickRecord, ClickSink, Host, LoadMetrics, PageManifest};
use linkdeck_core::{Capabilities, DeckConfig, Key};

const PAGE: &str = r#"
title = "Ada Lovelace"
viewport_height = 300.0

[[links]]
url = "https://x.example/a"
label = "Notes"

[[links]]
url = "https://x.example/b"
label = "Talks"

[[links]]
url = "https://x.example/c"
label = "Code"

[[links]]
url = "https://x.example/d"
label = "Photos"

[[links]]
url = "https://x.example/e"
"#;

#[derive(Default)]
struct Clicks(RefCell<Vec<ClickRecord>>);

impl ClickSink for Clicks {
    fn record(&self, record: &ClickRecord) {
        self.0.borrow_mut().push(record.clone());
    }
}

fn session(host: &Host) -> (App, Rc<Clicks>) {
    PageManifest::from_toml_str(PAGE)
        .unwrap()
        .build(host.document())
        .unwrap();
    let clicks = Rc::new(Clicks::default());
    let app = App::with_click_sink(host, DeckConfig::default(), Rc::clone(&clicks) as Rc<dyn ClickSink>)
        .unwrap();
    app.start();
    (app, clicks)
}

fn states(app: &App) -> Vec<CardState> {
    app.controller()
        .unwrap()
        .cards()
        .iter()
        .map(|c| c.state())
        .collect()
}

#[test]
fn full_session_animates_cards_as_they_scroll_in() {
    let host = Host::new(Capabilities::full());
    let (app, _) = session(&host);
    host.simulate_load();

    // Cards at 160, 240, 320, 400, 480 against 0..300 plus a 50px margin
    assert_eq!(
        states(&app),
        vec![
            CardState::Animating,
            CardState::Animating,
            CardState::Animating,
            CardState::Pending,
            CardState::Pending,
        ]
    );
    let controller = app.controller().unwrap();
    assert_eq!(controller.registration_count(), 2);

    let card2 = controller.cards()[2].element;
    let transition = host.document().style(card2, "transition").unwrap();
    assert!(transition.starts_with("opacity 640ms"), "{}", transition);
    assert!(transition.ends_with("160ms"), "{}", transition);

    host.scroll_to(400.0);
    assert_eq!(controller.registration_count(), 0);
    host.scheduler().run_until_idle();

    assert!(states(&app).iter().all(|s| *s == CardState::Settled));
    for card in controller.cards() {
        assert_eq!(
            host.document().style(card.element, "will-change").as_deref(),
            Some("auto")
        );
        assert_eq!(host.document().style(card.element, "opacity").as_deref(), Some("1"));
    }
    assert_eq!(controller.cards()[4].label, "Unknown");
}

#[test]
fn clicks_are_logged_once_per_url() {
    let host = Host::new(Capabilities::full());
    let (app, clicks) = session(&host);
    host.simulate_load();

    let cards: Vec<_> = app
        .controller()
        .unwrap()
        .cards()
        .iter()
        .map(|c| c.element)
        .collect();
    host.click(cards[1]);
    host.click(cards[1]);
    let outcome = host.key_down(cards[1], Key::Enter);
    assert!(!outcome.default_prevented);
    let outcome = host.key_down(cards[0], Key::Space);
    assert!(outcome.default_prevented);
    assert!(clicks.0.borrow().is_empty());

    host.scheduler().run_until_idle();
    let records = clicks.0.borrow();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].url, "https://x.example/b");
    assert_eq!(records[0].label, "Talks");
    assert_eq!(records[1].url, "https://x.example/a");
    assert_eq!(app.report().clicks.len(), 2);
}

#[test]
fn motion_preference_changes_reach_the_page() {
    let host = Host::new(Capabilities::full());
    let (app, _) = session(&host);
    host.simulate_load();

    let doc = host.document();
    let card = app.controller().unwrap().cards()[3].element;
    assert_eq!(doc.attribute(card, "data-motion").as_deref(), Some("full"));

    host.preferences().set_reduced_motion(true);
    assert!(app.reduced_motion());
    assert!(doc.has_class(doc.root(), "reduced-motion"));
    assert_eq!(doc.attribute(card, "data-motion").as_deref(), Some("reduced"));

    // Entrance of a card triggered after the change runs without stagger
    host.scroll_to(400.0);
    assert_eq!(app.controller().unwrap().entrance_timing(3).delay_ms, 0);
    host.scheduler().run_until_idle();
    assert!(states(&app).iter().all(|s| *s == CardState::Settled));
}

#[test]
fn minimal_host_degrades_gracefully() {
    let host = Host::new(Capabilities::minimal());
    let (app, clicks) = session(&host);
    host.simulate_load();

    assert!(states(&app).iter().all(|s| *s == CardState::Settled));
    assert_eq!(app.controller().unwrap().registration_count(), 0);
    assert_eq!(app.load_metrics(), LoadMetrics::default());
    assert!(!app.reduced_motion());

    let card = app.controller().unwrap().cards()[0].element;
    host.click(card);
    host.scheduler().run_until_idle();
    assert_eq!(clicks.0.borrow().len(), 1);
}

#[test]
fn load_metrics_are_captured() {
    let host = Host::new(Capabilities::full());
    let (app, _) = session(&host);
    host.simulate_load();

    let metrics = app.load_metrics();
    assert_eq!(metrics.first_paint_ms, Some(16.0));
    assert_eq!(metrics.first_contentful_paint_ms, Some(16.0));
    assert_eq!(metrics.dom_content_loaded_ms, Some(0.0));
    assert_eq!(metrics.load_complete_ms, Some(64.0));
}
