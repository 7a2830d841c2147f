//! Cooperative task scheduler.
//!
//! Tasks are plain function pointers registered once at initialization and
//! referenced afterwards through a [`TaskId`]. Each task carries the absolute
//! time it is due next; [`Instant::MAX`] parks it. The scheduler runs on a
//! single logical thread: a task runs to completion before the next one is
//! picked, and hardware completions reach it only through the
//! [`Runtime`](crate::runtime::Runtime) inbox.
//!
//! # Dispatch order
//!
//! The earliest due task runs first. Tasks due at the same instant run in
//! registration order, which keeps dispatch deterministic.
//!
//! # One-shot by default
//!
//! A task is parked right before its callback runs. A periodic task keeps
//! itself alive by re-planning from inside the callback, typically with
//! [`Plan::plan_current_relative`], which counts from the previous due time
//! so the cadence does not drift with dispatch latency.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::Error;
use crate::clock::{Clock, saturating_add};

/// Stable handle of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub struct TaskId(u8);

impl TaskId {
    /// Slot of the task in the scheduler table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Task callback.
///
/// `C` is the application context handed to [`Scheduler::run_pending`]; the
/// planner lets the task reschedule itself or any other task.
pub type TaskFn<C> = fn(&mut C, &mut dyn Plan);

/// Rescheduling interface available to tasks and completion handlers.
///
/// Every call only updates a due time; nothing runs until the next dispatch.
/// Unknown task ids are ignored.
pub trait Plan {
    /// Current time as seen by the scheduler.
    fn now(&self) -> Instant;

    /// Task being dispatched, if called from inside a task callback.
    fn current_task(&self) -> Option<TaskId>;

    /// Due time the current task had when it was dispatched.
    fn current_due(&self) -> Option<Instant>;

    /// Sets the due time of `id` to `at`. [`Instant::MAX`] parks it.
    fn plan_absolute(&mut self, id: TaskId, at: Instant);

    /// Plans `id` to run `delta` from now.
    fn plan_relative(&mut self, id: TaskId, delta: Duration) {
        let at = saturating_add(self.now(), delta);
        self.plan_absolute(id, at);
    }

    /// Makes `id` due immediately.
    fn plan_now(&mut self, id: TaskId) {
        self.plan_absolute(id, Instant::MIN);
    }

    fn plan_current_absolute(&mut self, at: Instant) {
        match self.current_task() {
            Some(id) => self.plan_absolute(id, at),
            None => {
                #[cfg(feature = "debug-mode")]
                defmt::warn!("plan_current_absolute called outside a task");
            }
        }
    }

    /// Re-plans the current task `delta` after its previous due time.
    fn plan_current_relative(&mut self, delta: Duration) {
        match (self.current_task(), self.current_due()) {
            (Some(id), Some(due)) => self.plan_absolute(id, saturating_add(due, delta)),
            _ => {
                #[cfg(feature = "debug-mode")]
                defmt::warn!("plan_current_relative called outside a task");
            }
        }
    }

    fn plan_current_now(&mut self) {
        self.plan_current_absolute(Instant::MIN);
    }
}

struct Task<C> {
    callback: TaskFn<C>,
    due: Instant,
}

/// Fixed-capacity table of tasks with their next due time.
pub struct Scheduler<C, K, const N: usize> {
    tasks: Vec<Task<C>, N>,
    clock: K,
    current: Option<(TaskId, Instant)>,
}

impl<C, K: Clock, const N: usize> Scheduler<C, K, N> {
    /// Creates an empty task table.
    ///
    /// # Arguments
    ///
    /// * `clock` - Tick source that decides which tasks are due
    pub fn new(clock: K) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            current: None,
        }
    }

    /// Adds a task to the table.
    ///
    /// # Arguments
    ///
    /// * `callback` - Function run when the task is dispatched
    /// * `due` - First due time, [`Instant::MAX`] registers it parked
    ///
    /// # Errors
    ///
    /// [`Error::SchedulerFull`] when the table is full, which is a
    /// configuration error.
    pub fn register(&mut self, callback: TaskFn<C>, due: Instant) -> Result<TaskId, Error> {
        let index = self.tasks.len();
        if index > u8::MAX as usize {
            return Err(Error::SchedulerFull);
        }
        self.tasks
            .push(Task { callback, due })
            .map_err(|_| Error::SchedulerFull)?;

        #[cfg(feature = "debug-mode")]
        defmt::debug!("registered task {}", index);

        Ok(TaskId(index as u8))
    }

    /// Number of registered tasks.
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Due time of a task, `None` for unknown ids.
    pub fn due(&self, id: TaskId) -> Option<Instant> {
        self.tasks.get(id.index()).map(|task| task.due)
    }

    /// Earliest due time among tasks that are not parked.
    pub fn next_due(&self) -> Option<Instant> {
        self.earliest().map(|(_, due)| due)
    }

    fn earliest(&self) -> Option<(usize, Instant)> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due != Instant::MAX)
            // `min_by_key` keeps the first of equal elements: registration order.
            .min_by_key(|(_, task)| task.due)
            .map(|(index, task)| (index, task.due))
    }

    /// Runs the earliest task if it is due.
    ///
    /// Returns the task that ran, or `None` if nothing is due yet.
    pub fn dispatch(&mut self, ctx: &mut C) -> Option<TaskId> {
        let (index, due) = self.earliest()?;
        if due > self.clock.now() {
            return None;
        }

        let id = TaskId(index as u8);
        let task = &mut self.tasks[index];
        task.due = Instant::MAX;
        let callback = task.callback;

        self.current = Some((id, due));
        callback(ctx, self);
        self.current = None;

        Some(id)
    }

    /// Runs due tasks until none is left, at most one round of the table.
    ///
    /// The bound keeps a task that re-plans itself to "now" from starving the
    /// caller's loop. Returns the number of tasks run.
    pub fn run_pending(&mut self, ctx: &mut C) -> usize {
        let mut ran = 0;
        while ran < self.len() {
            if self.dispatch(ctx).is_none() {
                break;
            }
            ran += 1;
        }
        ran
    }
}

impl<C, K: Clock, const N: usize> Plan for Scheduler<C, K, N> {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn current_task(&self) -> Option<TaskId> {
        self.current.map(|(id, _)| id)
    }

    fn current_due(&self) -> Option<Instant> {
        self.current.map(|(_, due)| due)
    }

    fn plan_absolute(&mut self, id: TaskId, at: Instant) {
        match self.tasks.get_mut(id.index()) {
            Some(task) => task.due = at,
            None => {
                #[cfg(feature = "debug-mode")]
                defmt::warn!("plan for unknown task {}", id);
            }
        }
    }
}
