use alloc::sync::Weak;

use derive_more::derive::{Display, From, Into};

use super::Irq;

/// An absolute reading of the timer's tick counter.
#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Tick(u64);
impl Tick {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self { Self(value) }

    pub const fn get(self) -> u64 { self.0 }

    /// `None` if the result does not fit the counter.
    pub const fn checked_add(self, ticks: u64) -> Option<Self> {
        match self.0.checked_add(ticks) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

/// Top-half timer interrupt routine.
///
/// This executes with the timer line masked, and is never re-entered.
pub trait TickHandler: Send + Sync {
    fn on_tick(&self);
}

/// The timer refused a handler because one is already installed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("timer interrupt handler already installed")]
pub struct HandlerBusy;
impl core::error::Error for HandlerBusy {}

/// A periodic hardware timer.
///
/// Implementations deliver ticks to the installed handler periodically, with
/// strictly increasing [`Timer::now`] readings between deliveries, and with
/// the timer line masked for the duration of the handler.
pub trait Timer: Irq + Send + Sync {
    /// Current tick count. Monotonically non-decreasing.
    fn now(&self) -> Tick;

    /// Install the tick handler.
    ///
    /// A timer carries at most one handler for its lifetime, so installing a
    /// second one fails with [`HandlerBusy`]. The timer only holds a weak
    /// reference: ticks arriving after the handler is dropped are discarded.
    fn set_interrupt_handler(&self, handler: Weak<dyn TickHandler>) -> Result<(), HandlerBusy>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_rejects_overflow() {
        assert_eq!(Tick::new(100).checked_add(50), Some(Tick::new(150)));
        assert_eq!(Tick::new(u64::MAX).checked_add(1), None);
        assert_eq!(Tick::new(u64::MAX).checked_add(0), Some(Tick::new(u64::MAX)));
    }

    #[test]
    fn tick_orders_by_count() {
        assert!(Tick::ZERO < Tick::new(1));
        assert_eq!(u64::from(Tick::from(7u64)), 7);
        assert_eq!(alloc::format!("{}", Tick::new(42)), "42");
    }
}
