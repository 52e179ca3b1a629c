//! Rate limiting and frame scheduling helpers
//!
//! - [`throttle`] - leading-edge, at most one execution per window, extra calls dropped
//! - [`debounce`] - one execution after a quiet period, every call restarts the wait
//! - [`next_frame`] - run before the next repaint, or after a fixed timer when
//!   the host has no animation frames
//! - [`when_idle`] - run once the loop is idle, or on a 0ms timer
//!
//! ```ignore
//! let on_move = throttle(&scheduler, 16, |pos: (f32, f32)| update(pos));
//! on_move.call((10.0, 20.0)); // runs
//! on_move.call((11.0, 20.0)); // dropped, same window
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scheduler::{Scheduler, TaskId};

// ============================================================================
// Next frame
// ============================================================================

/// Schedule `action` before the next repaint
///
/// Uses animation frames when the host provides them, otherwise a
/// `fallback_ms` timer. Callbacks on the same facility run first-scheduled
/// first.
pub fn next_frame<F>(scheduler: &Scheduler, fallback_ms: u32, action: F) -> TaskId
where
    F: FnOnce() + 'static,
{
    if scheduler.capabilities().animation_frames {
        scheduler.schedule_frame(Box::new(action))
    } else {
        scheduler.set_timeout(fallback_ms, action)
    }
}

/// Schedule low-priority `action` for when nothing else is due
///
/// Falls back to a 0ms timer on hosts without idle callbacks.
pub fn when_idle<F>(scheduler: &Scheduler, action: F) -> TaskId
where
    F: FnOnce() + 'static,
{
    if scheduler.capabilities().idle_callbacks {
        scheduler.schedule_idle(Box::new(action))
    } else {
        scheduler.set_timeout(0, action)
    }
}

// ============================================================================
// Throttle
// ============================================================================

struct ThrottleInner<A> {
    scheduler: Scheduler,
    interval_ms: u64,
    last_run: Cell<Option<u64>>,
    action: Box<dyn Fn(A)>,
}

/// A throttled action, see [`throttle`]
pub struct Throttled<A> {
    inner: Rc<ThrottleInner<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> Throttled<A> {
    /// Invoke the action unless a window is still open
    ///
    /// Returns `true` if the action ran.
    pub fn call(&self, arg: A) -> bool {
        let now = self.inner.scheduler.now();
        if let Some(last) = self.inner.last_run.get() {
            if now < last + self.inner.interval_ms {
                return false;
            }
        }
        self.inner.last_run.set(Some(now));
        (self.inner.action)(arg);
        true
    }

    pub fn interval_ms(&self) -> u64 {
        self.inner.interval_ms
    }
}

/// Wrap `action` so it executes at most once per `interval_ms`
pub fn throttle<A, F>(scheduler: &Scheduler, interval_ms: u32, action: F) -> Throttled<A>
where
    F: Fn(A) + 'static,
{
    Throttled {
        inner: Rc::new(ThrottleInner {
            scheduler: scheduler.clone(),
            interval_ms: u64::from(interval_ms),
            last_run: Cell::new(None),
            action: Box::new(action),
        }),
    }
}

// ============================================================================
// Debounce
// ============================================================================

struct DebounceInner<A> {
    scheduler: Scheduler,
    wait_ms: u32,
    pending: Cell<Option<TaskId>>,
    latest: RefCell<Option<A>>,
    action: Box<dyn Fn(A)>,
}

/// A debounced action, see [`debounce`]
pub struct Debounced<A> {
    inner: Rc<DebounceInner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Debounced<A> {
    /// Record a call and restart the wait window
    pub fn call(&self, arg: A) {
        *self.inner.latest.borrow_mut() = Some(arg);

        if let Some(id) = self.inner.pending.take() {
            self.inner.scheduler.clear_timeout(id);
        }

        let inner = Rc::clone(&self.inner);
        let id = self.inner.scheduler.set_timeout(self.inner.wait_ms, move || {
            inner.pending.set(None);
            let arg = inner.latest.borrow_mut().take();
            if let Some(arg) = arg {
                (inner.action)(arg);
            }
        });
        self.inner.pending.set(Some(id));
    }

    /// Drop the pending execution, if any
    pub fn cancel(&self) -> bool {
        self.inner.latest.borrow_mut().take();
        match self.inner.pending.take() {
            Some(id) => self.inner.scheduler.clear_timeout(id),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }
}

/// Wrap `action` so it runs once `wait_ms` has passed without another call
///
/// The action receives the argument of the last call.
pub fn debounce<A, F>(scheduler: &Scheduler, wait_ms: u32, action: F) -> Debounced<A>
where
    F: Fn(A) + 'static,
{
    Debounced {
        inner: Rc::new(DebounceInner {
            scheduler: scheduler.clone(),
            wait_ms,
            pending: Cell::new(None),
            latest: RefCell::new(None),
            action: Box::new(action),
        }),
    }
}
