//! linkdeck Application
//!
//! The enhancement layer of a link-in-bio page, built on the linkdeck
//! document model:
//!
//! - [`Controller`] - entrance animations and hover feedback for link cards
//! - [`MotionPreferenceMonitor`] - follows the system reduced-motion setting
//! - [`InteractionLogger`] - deduplicated click logging through a [`ClickSink`]
//! - [`LoadTimingObserver`] - paint and navigation milestones
//! - [`AccessibilityBinder`] - keyboard activation and motion attributes
//! - [`App`] - starts everything on DOMContentLoaded
//!
//! # Example
//!
//! ```ignore
//! use linkdeck_app::{App, Host, PageManifest};
//! use linkdeck_core::{Capabilities, DeckConfig};
//!
//! let host = Host::new(Capabilities::full());
//! PageManifest::load("page.toml".as_ref())?.build(host.document())?;
//!
//! let app = App::new(&host, DeckConfig::default())?;
//! app.start();
//! host.simulate_load();
//! host.scroll_to(400.0);
//! host.scheduler().run_until_idle();
//!
//! println!("{}", app.report());
//! ```

pub mod a11y;
pub mod app;
pub mod controller;
pub mod error;
pub mod host;
pub mod load_timing;
pub mod logger;
pub mod manifest;
pub mod motion;
pub mod report;

pub use a11y::AccessibilityBinder;
pub use app::App;
pub use controller::{
    entrance_timing, resolve_card, Card, CardState, Controller, EntranceTiming, MonitorFactory,
};
pub use error::{AppError, Result};
pub use host::Host;
pub use load_timing::{LoadMetrics, LoadTimingObserver};
pub use logger::{ClickRecord, ClickSink, InteractionLogger, TracingSink};
pub use manifest::{LinkEntry, PageManifest, StackLayout};
pub use motion::MotionPreferenceMonitor;
pub use report::{CardReport, PageReport};
