//! Dispatch loop.
//!
//! The [`Runtime`] is the single consumer of the analog completion inbox and
//! the only caller of the [`Scheduler`]. Each cycle it
//!
//! 1. hands every queued completion to the handler registered for its channel,
//! 2. runs the tasks that are due,
//! 3. sleeps until the next due time or until a new completion arrives,
//!    whichever comes first.
//!
//! Step 3 is the only suspension point of the node. On the target the
//! [`Idle`] implementation is an embassy timer, so the executor enters STOP
//! mode while it waits and any completion wakes it early.

use core::future::Future;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;

use crate::Error;
use crate::adc::{AdcChannel, AdcCompletion, AdcEvent, Inbox};
use crate::clock::Clock;
use crate::scheduler::{Plan, Scheduler, TaskFn, TaskId};

/// Handler for conversion completions of one channel.
pub type AdcHandler<C> = fn(&mut C, AdcEvent, &mut dyn Plan);

/// Registration interface used by components during initialization.
pub trait Registry<C> {
    /// Registers a scheduler task due at `due`.
    fn register_task(&mut self, callback: TaskFn<C>, due: Instant) -> Result<TaskId, Error>;

    /// Installs the completion handler of `channel`, replacing any previous one.
    fn set_adc_handler(&mut self, channel: AdcChannel, handler: AdcHandler<C>);

    /// Planner for scheduling decisions taken during initialization.
    fn planner(&mut self) -> &mut dyn Plan;
}

/// Low-power wait between dispatch cycles.
pub trait Idle {
    /// Resolves no earlier than `at`. [`Instant::MAX`] means "until woken".
    fn until(&mut self, at: Instant) -> impl Future<Output = ()>;
}

/// Scheduler plus completion inbox, driving the application context `C`.
///
/// `N` is the task capacity and `Q` the inbox depth.
pub struct Runtime<'a, C, K, M: RawMutex, const N: usize, const Q: usize> {
    scheduler: Scheduler<C, K, N>,
    inbox: &'a Inbox<M, Q>,
    adc_handlers: [Option<AdcHandler<C>>; AdcChannel::COUNT],
}

impl<'a, C, K, M, const N: usize, const Q: usize> Runtime<'a, C, K, M, N, Q>
where
    K: Clock,
    M: RawMutex,
{
    /// Creates a runtime with no tasks and no channel handlers.
    ///
    /// # Arguments
    ///
    /// * `clock` - Tick source of the scheduler
    /// * `inbox` - Queue the ADC driver posts completions into
    pub fn new(clock: K, inbox: &'a Inbox<M, Q>) -> Self {
        Self {
            scheduler: Scheduler::new(clock),
            inbox,
            adc_handlers: [None; AdcChannel::COUNT],
        }
    }

    /// Read access to the task table.
    pub fn scheduler(&self) -> &Scheduler<C, K, N> {
        &self.scheduler
    }

    /// Planner access outside of tasks, e.g. while reconfiguring a component.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<C, K, N> {
        &mut self.scheduler
    }

    /// Hands one completion to its channel handler.
    pub fn deliver(&mut self, ctx: &mut C, completion: AdcCompletion) {
        match self.adc_handlers[completion.channel.index()] {
            Some(handler) => handler(ctx, completion.event, &mut self.scheduler),
            None => {
                #[cfg(feature = "debug-mode")]
                defmt::warn!("no handler for {}", completion.channel);
            }
        }
    }

    /// Drains the inbox, then runs every task that is due.
    ///
    /// Returns the number of tasks run.
    pub fn service(&mut self, ctx: &mut C) -> usize {
        while let Ok(completion) = self.inbox.try_receive() {
            self.deliver(ctx, completion);
        }
        self.scheduler.run_pending(ctx)
    }

    /// One dispatch cycle, ending with the idle wait when nothing is due.
    pub async fn run_once<I: Idle>(&mut self, ctx: &mut C, idle: &mut I) {
        self.service(ctx);

        let wake = self.scheduler.next_due().unwrap_or(Instant::MAX);
        if wake <= self.scheduler.now() {
            return;
        }

        #[cfg(feature = "debug-mode")]
        defmt::trace!("idle until {}", wake.as_millis());

        let inbox = self.inbox;
        match select(idle.until(wake), inbox.receive()).await {
            Either::First(()) => {}
            Either::Second(completion) => self.deliver(ctx, completion),
        }
    }

    /// Runs dispatch cycles forever.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Application context handed to tasks and handlers
    /// * `idle` - Low-power wait used between cycles
    pub async fn run_forever<I: Idle>(&mut self, ctx: &mut C, idle: &mut I) -> ! {
        loop {
            self.run_once(ctx, idle).await;
        }
    }
}

impl<'a, C, K, M, const N: usize, const Q: usize> Registry<C> for Runtime<'a, C, K, M, N, Q>
where
    K: Clock,
    M: RawMutex,
{
    fn register_task(&mut self, callback: TaskFn<C>, due: Instant) -> Result<TaskId, Error> {
        self.scheduler.register(callback, due)
    }

    fn set_adc_handler(&mut self, channel: AdcChannel, handler: AdcHandler<C>) {
        self.adc_handlers[channel.index()] = Some(handler);
    }

    fn planner(&mut self) -> &mut dyn Plan {
        &mut self.scheduler
    }
}
