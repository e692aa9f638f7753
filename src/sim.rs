//! Deterministic stand-ins for the hardware timer and the thread scheduler.
//!
//! Time only moves when the driver calls [`SimTimer::tick`] or
//! [`SimTimer::advance`], and a context switch is a state change in
//! [`SimScheduler`]'s thread table. Nothing actually switches stacks: a call
//! that would block in a real kernel returns to the driver once the thread is
//! marked blocked.
mod sched;
mod timer;

pub use sched::{SimScheduler, ThreadId};
pub use timer::{SimConfig, SimTimer, TIMER_TICKS};
