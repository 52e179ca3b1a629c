//! linkdeck Scheduling & Animation
//!
//! Time-based primitives the enhancement layer is built on.
//!
//! # Features
//!
//! - **Scheduler**: single-threaded cooperative event loop with virtual time,
//!   timers, animation frames and idle callbacks
//! - **Throttle / Debounce**: rate-limit repeated invocations of a callback
//! - **Next Frame**: run work before the next repaint, falling back to a timer
//! - **Easing & Transitions**: CSS timing functions and `transition` specs

pub mod easing;
pub mod scheduler;
pub mod timing;
pub mod transition;

pub use easing::Easing;
pub use scheduler::{Scheduler, SchedulerError, TaskId, TaskKind, DEFAULT_FRAME_INTERVAL_MS};
pub use timing::{debounce, next_frame, throttle, when_idle, Debounced, Throttled};
pub use transition::{TransitionProperty, TransitionSpec};
