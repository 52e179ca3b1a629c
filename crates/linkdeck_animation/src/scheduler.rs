//! Event loop scheduler
//!
//! A single-threaded cooperative event loop driven by virtual time. All
//! deferred work in linkdeck goes through it:
//!
//! - **Timers** - `set_timeout` / `clear_timeout`
//! - **Animation frames** - callbacks aligned to the next frame boundary
//! - **Idle callbacks** - work deferred until nothing else is due
//!
//! Time only moves when the host calls [`Scheduler::advance`] or
//! [`Scheduler::run_until_idle`], which makes every test deterministic.
//!
//! # Ordering
//!
//! Tasks run in `(due time, kind, scheduling order)` order. At the same due
//! time timers run before frames, and frames before idle callbacks. A task
//! may schedule more work; work due at or before the current horizon runs in
//! the same `advance` call.
//!
//! ```ignore
//! use linkdeck_animation::Scheduler;
//! use linkdeck_core::Capabilities;
//!
//! let scheduler = Scheduler::new(Capabilities::full());
//! scheduler.set_timeout(100, || println!("later"));
//! scheduler.request_animation_frame(|| println!("before repaint"))?;
//! scheduler.advance(100);
//! ```

use linkdeck_core::Capabilities;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Frame interval of a 60Hz display, rounded down
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Upper bound on tasks executed by a single `run_until_idle`
const MAX_TASKS_PER_RUN: usize = 100_000;

new_key_type! {
    /// Handle to a scheduled timer, frame or idle callback
    pub struct TaskId;
}

/// Scheduler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The host does not provide the requested facility
    #[error("Capability not available: {0}")]
    CapabilityUnavailable(&'static str),
}

/// Which facility a task was scheduled on
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKind {
    Timer,
    Frame,
    Idle,
}

type Task = Box<dyn FnOnce()>;

struct ScheduledTask {
    due: u64,
    kind: TaskKind,
    seq: u64,
    task: Task,
}

impl ScheduledTask {
    fn order_key(&self) -> (u64, TaskKind, u64) {
        (self.due, self.kind, self.seq)
    }
}

/// Internal state of the scheduler
struct SchedulerInner {
    now_ms: u64,
    next_seq: u64,
    tasks: SlotMap<TaskId, ScheduledTask>,
    frame_interval_ms: u64,
    capabilities: Capabilities,
}

/// Cooperative event loop with virtual time
///
/// Cheap to clone; clones share the same queue and clock.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now_ms", &inner.now_ms)
            .field("pending", &inner.tasks.len())
            .field("frame_interval_ms", &inner.frame_interval_ms)
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl Scheduler {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                now_ms: 0,
                next_seq: 0,
                tasks: SlotMap::with_key(),
                frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
                capabilities,
            })),
        }
    }

    /// Set the frame interval used to align animation frames
    pub fn with_frame_interval(self, interval_ms: u64) -> Self {
        self.inner.borrow_mut().frame_interval_ms = interval_ms.max(1);
        self
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.borrow().capabilities
    }

    /// Number of tasks waiting to run
    pub fn pending_tasks(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Due time of the next task, if any
    pub fn next_due(&self) -> Option<u64> {
        self.inner
            .borrow()
            .tasks
            .values()
            .map(|t| t.order_key())
            .min()
            .map(|(due, _, _)| due)
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Run `f` after `delay_ms`
    pub fn set_timeout<F>(&self, delay_ms: u32, f: F) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        let due = self.now() + u64::from(delay_ms);
        self.schedule(due, TaskKind::Timer, Box::new(f))
    }

    /// Cancel a pending task of any kind, returning whether it was pending
    pub fn clear_timeout(&self, id: TaskId) -> bool {
        self.inner.borrow_mut().tasks.remove(id).is_some()
    }

    /// Run `f` at the next frame boundary
    pub fn request_animation_frame<F>(&self, f: F) -> Result<TaskId, SchedulerError>
    where
        F: FnOnce() + 'static,
    {
        if !self.capabilities().animation_frames {
            return Err(SchedulerError::CapabilityUnavailable("requestAnimationFrame"));
        }
        Ok(self.schedule_frame(Box::new(f)))
    }

    pub fn cancel_animation_frame(&self, id: TaskId) -> bool {
        self.clear_timeout(id)
    }

    /// Run `f` once no timer or frame is due at the current time
    pub fn request_idle_callback<F>(&self, f: F) -> Result<TaskId, SchedulerError>
    where
        F: FnOnce() + 'static,
    {
        if !self.capabilities().idle_callbacks {
            return Err(SchedulerError::CapabilityUnavailable("requestIdleCallback"));
        }
        Ok(self.schedule_idle(Box::new(f)))
    }

    /// Idle scheduling without the capability probe
    pub(crate) fn schedule_idle(&self, task: Task) -> TaskId {
        let due = self.now();
        self.schedule(due, TaskKind::Idle, task)
    }

    /// Frame scheduling without the capability probe
    pub(crate) fn schedule_frame(&self, task: Task) -> TaskId {
        let due = {
            let inner = self.inner.borrow();
            (inner.now_ms / inner.frame_interval_ms + 1) * inner.frame_interval_ms
        };
        self.schedule(due, TaskKind::Frame, task)
    }

    fn schedule(&self, due: u64, kind: TaskKind, task: Task) -> TaskId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(ScheduledTask {
            due,
            kind,
            seq,
            task,
        })
    }

    // =========================================================================
    // Driving the loop
    // =========================================================================

    /// Move time forward by `ms`, running every task due up to then
    ///
    /// Returns the number of tasks executed.
    pub fn advance(&self, ms: u64) -> usize {
        let horizon = self.now() + ms;
        let mut ran = 0;
        while self.run_next(horizon) {
            ran += 1;
        }
        self.inner.borrow_mut().now_ms = horizon;
        ran
    }

    /// Run tasks until the queue is empty
    ///
    /// Time jumps to each task's due time. Returns the number of tasks
    /// executed.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next(u64::MAX) {
            ran += 1;
            if ran >= MAX_TASKS_PER_RUN {
                tracing::warn!(
                    pending = self.pending_tasks(),
                    "scheduler still busy after {} tasks, stopping",
                    MAX_TASKS_PER_RUN
                );
                break;
            }
        }
        ran
    }

    /// Pop and run the earliest task due at or before `horizon`
    fn run_next(&self, horizon: u64) -> bool {
        let next = {
            let mut inner = self.inner.borrow_mut();
            let id = inner
                .tasks
                .iter()
                .filter(|(_, t)| t.due <= horizon)
                .min_by_key(|(_, t)| t.order_key())
                .map(|(id, _)| id);

            match id.and_then(|id| inner.tasks.remove(id)) {
                Some(task) => {
                    inner.now_ms = inner.now_ms.max(task.due);
                    task
                }
                None => return false,
            }
        };

        // The borrow is released so the task can schedule more work
        (next.task)();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let make = move |name: &'static str| -> Box<dyn FnOnce()> {
            let l = Rc::clone(&l);
            Box::new(move || l.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_timers_run_in_due_order() {
        let scheduler = Scheduler::new(Capabilities::full());
        let (log, make) = recorder();

        scheduler.set_timeout(50, make("b"));
        scheduler.set_timeout(10, make("a"));
        scheduler.set_timeout(50, make("c"));

        assert_eq!(scheduler.advance(49), 1);
        assert_eq!(*log.borrow(), vec!["a"]);

        scheduler.advance(1);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), 50);
    }

    #[test]
    fn test_clear_timeout() {
        let scheduler = Scheduler::default();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let id = scheduler.set_timeout(5, move || f.set(true));

        assert!(scheduler.clear_timeout(id));
        assert!(!scheduler.clear_timeout(id));
        scheduler.run_until_idle();
        assert!(!fired.get());
    }

    #[test]
    fn test_frames_align_to_interval() {
        let scheduler = Scheduler::new(Capabilities::full());
        scheduler.advance(5);

        let at = Rc::new(Cell::new(0));
        let a = Rc::clone(&at);
        let s = scheduler.clone();
        scheduler
            .request_animation_frame(move || a.set(s.now()))
            .unwrap();

        scheduler.run_until_idle();
        assert_eq!(at.get(), 16);
    }

    #[test]
    fn test_frame_requested_inside_frame_waits_for_next() {
        let scheduler = Scheduler::new(Capabilities::full());
        let at = Rc::new(Cell::new(0));
        let a = Rc::clone(&at);
        let s = scheduler.clone();
        scheduler
            .request_animation_frame(move || {
                let inner_s = s.clone();
                s.request_animation_frame(move || a.set(inner_s.now()))
                    .unwrap();
            })
            .unwrap();

        scheduler.run_until_idle();
        assert_eq!(at.get(), 32);
    }

    #[test]
    fn test_same_time_ordering() {
        let scheduler = Scheduler::new(Capabilities::full());
        let (log, make) = recorder();

        scheduler.request_idle_callback(make("idle")).unwrap();
        scheduler.request_animation_frame(make("frame")).unwrap();
        scheduler.set_timeout(16, make("timer"));
        scheduler.set_timeout(0, make("zero"));

        scheduler.run_until_idle();
        assert_eq!(*log.borrow(), vec!["zero", "idle", "timer", "frame"]);
    }

    #[test]
    fn test_missing_capabilities_are_errors() {
        let scheduler = Scheduler::new(Capabilities::minimal());
        assert_eq!(
            scheduler.request_animation_frame(|| {}).unwrap_err(),
            SchedulerError::CapabilityUnavailable("requestAnimationFrame")
        );
        assert!(scheduler.request_idle_callback(|| {}).is_err());
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_tasks_can_schedule_within_horizon() {
        let scheduler = Scheduler::default();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let s = scheduler.clone();
        scheduler.set_timeout(10, move || {
            c.set(c.get() + 1);
            let c2 = Rc::clone(&c);
            s.set_timeout(10, move || c2.set(c2.get() + 1));
        });

        assert_eq!(scheduler.advance(20), 2);
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.next_due(), None);
    }
}
