use core::fmt::Debug;

use crate::interrupt::IntrptGuard;

/// Scheduler state of a thread, as seen by the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ThreadState {
    Running,
    Ready,
    /// Not runnable until someone calls [`Scheduler::mark_ready`].
    Blocked,
}

/// The thread scheduler the alarm preempts and wakes threads through.
pub trait Scheduler: Send + Sync {
    /// Non-owning handle to a thread. The scheduler owns the thread itself.
    type Thread: Clone + Eq + Debug + Send;

    /// The thread currently executing.
    fn current(&self) -> Self::Thread;

    /// Yield to another thread if available, keeping the current thread
    /// runnable.
    ///
    /// Called from the timer interrupt handler on every tick.
    fn yield_current(&self);

    /// Can `thread` be rescheduled as [`ThreadState::Blocked`].
    ///
    /// Threads that must stay runnable, such as an idle thread, return `false`.
    fn can_block(&self, thread: &Self::Thread) -> bool;

    /// Yields to a new thread while rescheduling the current thread to
    /// `new_state`.
    ///
    /// `intrpt` keeps the timer line masked up to the switch; the scheduler
    /// drops it once the current thread is switched back in. This call blocks
    /// until then.
    fn reschedule(&self, new_state: ThreadState, intrpt: IntrptGuard<'_>);

    /// Move a blocked thread to the ready set.
    ///
    /// Must not block, since it runs in interrupt context. Marking a thread
    /// that is already ready or running is a no-op.
    fn mark_ready(&self, thread: Self::Thread);
}
