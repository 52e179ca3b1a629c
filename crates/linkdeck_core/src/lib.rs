//! linkdeck Core
//!
//! Foundational types shared by every linkdeck crate:
//!
//! - **Configuration**: [`DeckConfig`] tunables, loaded from TOML and read-only after startup
//! - **Capabilities**: [`Capabilities`] flags describing which optional platform APIs exist
//! - **Motion Preference**: [`MotionPreference`], the explicitly-owned reduced-motion state
//! - **Events**: [`EventType`] and [`Key`] shared by the document and the controller
//!
//! # Example
//!
//! ```rust
//! use linkdeck_core::{DeckConfig, MotionPreference};
//!
//! let config = DeckConfig::default();
//! assert_eq!(config.animation.stagger_delay_ms, 80);
//!
//! let motion = MotionPreference::new(false);
//! motion.on_change(|reduced| println!("reduced motion: {reduced}"));
//! motion.set(true);
//! assert!(motion.current());
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod motion;
pub mod platform;

pub use config::{
    AnimationConfig, DeckConfig, HoverConfig, ObserverConfig, ReportVerbosity, ReportingConfig,
    SchedulingConfig, SelectorConfig,
};
pub use error::{ConfigError, Result};
pub use events::{EventType, Key};
pub use motion::{MotionListenerId, MotionPreference};
pub use platform::Capabilities;
