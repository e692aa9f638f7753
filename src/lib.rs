//! Timer driven sleep and preemption for a cooperative kernel scheduler.
//!
//! [`Alarm`] installs itself as the tick handler of a [`Timer`]. Every tick
//! forces the running thread to yield, then moves every thread whose wake time
//! has been reached from the sleeping registry back to the scheduler's ready
//! set. Threads go to sleep with [`Alarm::wait_until`].
//!
//! [`sim`] provides a deterministic timer and scheduler that implement the
//! collaborator traits without hardware.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod alarm;
mod common;
pub mod interrupt;
pub mod sched;
pub mod sim;

pub use alarm::{Alarm, AlarmError};
pub use interrupt::timer::{HandlerBusy, Tick, TickHandler, Timer};
pub use interrupt::{Irq, IntrptGuard};
pub use sched::{Scheduler, ThreadState};
