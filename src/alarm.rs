use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicBool, Ordering};

use derive_more::derive::Display;
use registry::Registry;

use crate::common::log::{debug, error, ok, trace};
use crate::interrupt::timer::{HandlerBusy, Tick, TickHandler, Timer};
use crate::interrupt::IntrptGuard;
use crate::sched::{Scheduler, ThreadState};

pub mod registry;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AlarmError {
    #[display("an alarm is already installed on this timer")]
    AlreadyInstalled,
    #[display("wait_until called from the timer interrupt handler")]
    InInterrupt,
    #[display("thread cannot block")]
    CannotBlock,
    #[display("thread is already sleeping")]
    AlreadySleeping,
    #[display("wake time overflows the tick counter")]
    WakeTimeOverflow,
}
impl core::error::Error for AlarmError {}

impl From<HandlerBusy> for AlarmError {
    fn from(_: HandlerBusy) -> Self { Self::AlreadyInstalled }
}

/// Uses the timer to preempt the running thread on every tick, and to let
/// threads sleep until a given tick.
///
/// There is one alarm per timer: [`Alarm::install`] hands the alarm to the
/// timer as its tick handler, and fails if the timer already has one.
pub struct Alarm<T: Timer, S: Scheduler> {
    timer: Arc<T>,
    sched: Arc<S>,
    sleeping: spin::Mutex<Registry<S::Thread>>,
    in_tick: AtomicBool,
}
impl<T, S> Alarm<T, S>
where
    T: Timer + 'static,
    S: Scheduler + 'static,
{
    /// Create an alarm and install it as `timer`'s interrupt handler.
    ///
    /// The alarm lives as long as the returned handle; the timer only keeps a
    /// weak reference.
    pub fn install(timer: Arc<T>, sched: Arc<S>) -> Result<Arc<Self>, AlarmError> {
        let alarm = Arc::new(Self {
            timer,
            sched,
            sleeping: spin::Mutex::new(Registry::new()),
            in_tick: AtomicBool::new(false),
        });

        let handler: Weak<dyn TickHandler> = Arc::downgrade(&alarm) as Weak<dyn TickHandler>;
        if let Err(err) = alarm.timer.set_interrupt_handler(handler) {
            error!("Alarm install failed: {err}");
            return Err(err.into());
        }
        ok!("Alarm installed at tick {}", alarm.timer.now());
        Ok(alarm)
    }

    /// Put the current thread to sleep for at least `ticks` ticks.
    ///
    /// The thread is woken by the first timer tick at which
    /// `now() >= (time of the call) + ticks`. With `ticks == 0` the thread
    /// still sleeps until the next tick.
    ///
    /// # Panics
    /// On any [`AlarmError`] from [`Alarm::try_wait_until`]; these are
    /// contract violations by the caller.
    pub fn wait_until(&self, ticks: u64) {
        if let Err(err) = self.try_wait_until(ticks) {
            panic!("wait_until({ticks}): {err}");
        }
    }

    /// Fallible form of [`Alarm::wait_until`].
    pub fn try_wait_until(&self, ticks: u64) -> Result<(), AlarmError> {
        if self.in_tick.load(Ordering::Acquire) {
            error!("wait_until({ticks}) from the timer interrupt handler");
            return Err(AlarmError::InInterrupt);
        }

        // The tick handler must not run between the insert and the block, or
        // it could wake a thread that has not gone to sleep yet.
        let intrpt = IntrptGuard::new(&*self.timer);

        let now = self.timer.now();
        let wake_time = now
            .checked_add(ticks)
            .ok_or(AlarmError::WakeTimeOverflow)?;
        let thread = self.sched.current();
        if !self.sched.can_block(&thread) {
            error!("{thread:?} called wait_until but cannot block");
            return Err(AlarmError::CannotBlock);
        }
        if self.sleeping.lock().insert(thread.clone(), wake_time).is_err() {
            error!("{thread:?} called wait_until while already sleeping");
            return Err(AlarmError::AlreadySleeping);
        }
        debug!("{thread:?} sleeping at tick {now} until {wake_time}");

        self.sched.reschedule(ThreadState::Blocked, intrpt);
        Ok(())
    }

    /// Number of threads currently sleeping.
    pub fn sleeping(&self) -> usize { self.sleeping.lock().len() }

    /// The tick `thread` is set to wake at, if it is sleeping.
    pub fn wake_time(&self, thread: &S::Thread) -> Option<Tick> {
        self.sleeping.lock().wake_time(thread)
    }

    /// The earliest tick at which a sleeping thread is due.
    pub fn next_wake_time(&self) -> Option<Tick> { self.sleeping.lock().next_wake_time() }
}

impl<T, S> TickHandler for Alarm<T, S>
where
    T: Timer + 'static,
    S: Scheduler + 'static,
{
    /// Preempt the running thread, then wake every thread whose wake time has
    /// been reached.
    fn on_tick(&self) {
        self.in_tick.store(true, Ordering::Release);

        self.sched.yield_current();

        // Read after the yield; time may have advanced while switched out.
        let now = self.timer.now();
        let woken = self.sleeping.lock().drain_due(now);
        trace!("Tick {now}");
        // The registry lock is released before calling into the scheduler.
        for (thread, wake_time) in woken {
            debug!("{thread:?} woken at tick {now} (due {wake_time})");
            self.sched.mark_ready(thread);
        }

        self.in_tick.store(false, Ordering::Release);
    }
}
