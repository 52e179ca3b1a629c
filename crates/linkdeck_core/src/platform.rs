//! Platform capability flags
//!
//! Every optional host API is probed through these flags before use. A
//! missing capability either selects a fallback (timers instead of animation
//! frames) or disables the feature (no performance observation).

/// Optional host APIs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Callbacks aligned to the next repaint
    pub animation_frames: bool,
    /// Callbacks deferred until the event loop is idle
    pub idle_callbacks: bool,
    /// Asynchronous visibility reporting for elements
    pub intersection_observer: bool,
    /// Subscription to paint and navigation timing entries
    pub performance_observer: bool,
    /// System reduced-motion preference query
    pub reduced_motion_query: bool,
}

impl Capabilities {
    /// A modern host with every API available
    pub fn full() -> Self {
        Self {
            animation_frames: true,
            idle_callbacks: true,
            intersection_observer: true,
            performance_observer: true,
            reduced_motion_query: true,
        }
    }

    /// A host without any optional API
    pub fn minimal() -> Self {
        Self {
            animation_frames: false,
            idle_callbacks: false,
            intersection_observer: false,
            performance_observer: false,
            reduced_motion_query: false,
        }
    }

    pub fn without_animation_frames(mut self) -> Self {
        self.animation_frames = false;
        self
    }

    pub fn without_idle_callbacks(mut self) -> Self {
        self.idle_callbacks = false;
        self
    }

    pub fn without_intersection_observer(mut self) -> Self {
        self.intersection_observer = false;
        self
    }

    pub fn without_performance_observer(mut self) -> Self {
        self.performance_observer = false;
        self
    }

    pub fn without_reduced_motion_query(mut self) -> Self {
        self.reduced_motion_query = false;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}
