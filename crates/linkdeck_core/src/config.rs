//! linkdeck configuration
//!
//! A fixed set of tunables for the entrance animation, hover feedback,
//! visibility observation and reporting. Every field has a default, so an
//! empty TOML document is a valid configuration:
//!
//! ```toml
//! [animation]
//! stagger_delay_ms = 80
//! base_duration_ms = 600
//!
//! [hover]
//! throttle_ms = 16
//!
//! [reporting]
//! verbosity = "detailed"
//! ```
//!
//! The configuration is read-only once the application has started.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

// =============================================================================
// Top-level configuration
// =============================================================================

/// All linkdeck tunables
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeckConfig {
    pub animation: AnimationConfig,
    pub observer: ObserverConfig,
    pub hover: HoverConfig,
    pub scheduling: SchedulingConfig,
    pub reporting: ReportingConfig,
    pub selectors: SelectorConfig,
}

impl DeckConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: DeckConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, validating it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.observer.thresholds.is_empty() {
            return Err(ConfigError::Invalid {
                field: "observer.thresholds",
                reason: "at least one threshold is required".to_string(),
            });
        }
        if let Some(t) = self
            .observer
            .thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(ConfigError::Invalid {
                field: "observer.thresholds",
                reason: format!("{} is outside [0, 1]", t),
            });
        }
        if self.hover.throttle_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "hover.throttle_ms",
                reason: "throttle window must be non-zero".to_string(),
            });
        }
        if self.scheduling.frame_fallback_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduling.frame_fallback_ms",
                reason: "fallback frame delay must be non-zero".to_string(),
            });
        }
        if self.selectors.card.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "selectors.card",
                reason: "selector must not be empty".to_string(),
            });
        }
        if self.selectors.title.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "selectors.title",
                reason: "selector must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Entrance animation timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Delay added per card index before its entrance starts
    pub stagger_delay_ms: u32,
    /// Entrance duration of the first card
    pub base_duration_ms: u32,
    /// Extra duration per card index (later cards animate slightly slower)
    pub duration_increment_ms: u32,
    /// Slack after the transition ends before the rendering hint is reset
    pub cleanup_grace_ms: u32,
    /// Initial downward offset of a card waiting for its entrance
    pub entrance_offset_px: f32,
    /// CSS timing function for the opacity transition
    pub opacity_easing: String,
    /// CSS timing function for the transform transition
    pub transform_easing: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            stagger_delay_ms: 80,
            base_duration_ms: 600,
            duration_increment_ms: 20,
            cleanup_grace_ms: 100,
            entrance_offset_px: 20.0,
            opacity_easing: "cubic-bezier(0.4, 0, 0.2, 1)".to_string(),
            transform_easing: "cubic-bezier(0.34, 1.56, 0.64, 1)".to_string(),
        }
    }
}

/// Visibility monitor options
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Margin added around the viewport so observation triggers slightly early
    pub root_margin_px: f32,
    /// Visibility fractions at which entries are reported
    pub thresholds: Vec<f32>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            root_margin_px: 50.0,
            thresholds: vec![0.0, 0.1, 0.25],
        }
    }
}

/// Hover and touch feedback
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HoverConfig {
    /// Throttle window for pointer-enter / pointer-leave handlers
    pub throttle_ms: u32,
    /// Delay after pointer-leave before the rendering hint is cleared
    pub settle_delay_ms: u32,
    /// Per-index transition delay applied to the hover response
    pub stagger_ms: u32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 16,
            settle_delay_ms: 300,
            stagger_ms: 10,
        }
    }
}

/// Scheduling fallbacks
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Timer delay used by `next_frame` when animation frames are unavailable
    pub frame_fallback_ms: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            frame_fallback_ms: 16,
        }
    }
}

/// Performance reporting
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub verbosity: ReportVerbosity,
}

/// How much the load timing observer reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportVerbosity {
    /// Record metrics without logging
    Silent,
    /// One line once navigation completes
    #[default]
    Summary,
    /// Every entry as it arrives, plus the summary
    Detailed,
}

impl fmt::Display for ReportVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportVerbosity::Silent => write!(f, "silent"),
            ReportVerbosity::Summary => write!(f, "summary"),
            ReportVerbosity::Detailed => write!(f, "detailed"),
        }
    }
}

impl FromStr for ReportVerbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(ReportVerbosity::Silent),
            "summary" => Ok(ReportVerbosity::Summary),
            "detailed" => Ok(ReportVerbosity::Detailed),
            other => Err(ConfigError::Invalid {
                field: "reporting.verbosity",
                reason: format!("unknown verbosity '{}'", other),
            }),
        }
    }
}

/// Markup contract selectors
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selects the link cards
    pub card: String,
    /// Selects the title inside a card
    pub title: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            card: ".link-card".to_string(),
            title: ".link-title".to_string(),
        }
    }
}
