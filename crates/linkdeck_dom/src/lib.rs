//! linkdeck Document Model
//!
//! The host surface the enhancement layer runs against:
//!
//! - [`Document`] - element tree with attributes, classes, inline styles,
//!   layout boxes and a scrollable viewport
//! - [`selector`] - CSS selector subset parsed with `nom`
//! - [`query`] - fault-tolerant `query_one` / `query_all` over the document
//! - [`event`] - listener registration and dispatch with passive listeners
//! - [`observer`] - [`VisibilityMonitor`] trait and [`IntersectionObserver`]
//! - [`preferences`] - system reduced-motion query
//! - [`performance`] - paint and navigation timing entries
//!
//! # Example
//!
//! ```ignore
//! use linkdeck_dom::{query, Document};
//!
//! let doc = Document::new();
//! let card = doc.create_element("a");
//! doc.add_class(card, "link-card");
//! doc.append_child(doc.body(), card);
//!
//! assert_eq!(query::query_all(&doc, ".link-card", None), vec![card]);
//! assert!(query::query_one(&doc, "..broken", None).is_none());
//! ```

pub mod document;
pub mod error;
pub mod event;
pub mod observer;
pub mod performance;
pub mod preferences;
pub mod query;
pub mod selector;

pub use document::{
    Document, ElementId, LayoutBox, ReadyState, Viewport, ViewportListenerId, WeakDocument,
};
pub use error::{DomError, Result};
pub use event::{DispatchOutcome, EventCallback, EventContext, EventTarget, ListenerId, ListenerOptions};
pub use observer::{
    IntersectionEntry, IntersectionObserver, ObserverOptions, VisibilityCallback, VisibilityMonitor,
};
pub use performance::{
    EntryType, NavigationTiming, PerformanceCallback, PerformanceEntry, PerformanceObserver,
    PerformanceTimeline,
};
pub use preferences::{PreferenceListenerId, SystemPreferences};
pub use selector::{Combinator, CompoundSelector, ComplexSelector, SelectorList};
