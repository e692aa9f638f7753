use alloc::sync::Weak;

use crate::common::log::{info, trace};
use crate::interrupt::timer::{HandlerBusy, Tick, TickHandler, Timer};
use crate::interrupt::Irq;

/// Default number of ticks between timer interrupts.
pub const TIMER_TICKS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Tick count at power on.
    pub start: Tick,
    /// Ticks advanced by [`SimTimer::tick`].
    pub interval: u64,
}
impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: Tick::ZERO,
            interval: TIMER_TICKS,
        }
    }
}

struct TimerState {
    now: Tick,
    handler: Option<Weak<dyn TickHandler>>,
    masked: bool,
    /// An interrupt was raised and not yet delivered. Interrupts raised while
    /// one is pending collapse into it.
    pending: bool,
    delivered: usize,
}

/// A timer whose clock is advanced by hand.
///
/// Every advance raises one interrupt. The interrupt is delivered right away
/// unless the line is masked, in which case it is latched and delivered when
/// the line is unmasked. The handler runs with the line masked.
pub struct SimTimer {
    config: SimConfig,
    state: spin::Mutex<TimerState>,
}
impl SimTimer {
    pub fn new(config: SimConfig) -> Self {
        assert!(config.interval > 0, "timer interval must be positive");
        Self {
            config,
            state: spin::Mutex::new(TimerState {
                now: config.start,
                handler: None,
                masked: false,
                pending: false,
                delivered: 0,
            }),
        }
    }

    pub fn config(&self) -> SimConfig { self.config }

    /// Advance by the configured interval and raise an interrupt.
    pub fn tick(&self) { self.advance(self.config.interval) }

    /// Advance by `by` ticks and raise an interrupt.
    ///
    /// # Panics
    /// If `by` is zero, since tick readings must strictly increase between
    /// interrupts, or if the counter overflows.
    pub fn advance(&self, by: u64) {
        assert!(by > 0, "timer must advance between interrupts");
        {
            let mut state = self.state.lock();
            state.now = state
                .now
                .checked_add(by)
                .expect("simulated tick counter overflowed");
            state.pending = true;
        }
        self.deliver();
    }

    /// Advance to `to` and raise an interrupt.
    pub fn advance_to(&self, to: Tick) {
        let now = self.now();
        assert!(to > now, "cannot advance from {now} back to {to}");
        self.advance(to.get() - now.get());
    }

    /// Number of interrupts the handler has received.
    pub fn delivered(&self) -> usize { self.state.lock().delivered }

    /// Is an interrupt latched behind the mask.
    pub fn is_pending(&self) -> bool { self.state.lock().pending }

    fn deliver(&self) {
        let (now, handler) = {
            let mut state = self.state.lock();
            if state.masked || !state.pending {
                return;
            }
            state.pending = false;
            state.masked = true;
            let handler = state.handler.as_ref().and_then(Weak::upgrade);
            if handler.is_some() {
                state.delivered += 1;
            }
            (state.now, handler)
        };

        match handler {
            Some(handler) => handler.on_tick(),
            None => trace!("Tick {now} dropped, no handler"),
        }

        // Anything raised by the handler was latched; deliver it now.
        self.unmask();
    }
}

impl Default for SimTimer {
    fn default() -> Self { Self::new(SimConfig::default()) }
}

impl Irq for SimTimer {
    fn mask(&self) { self.state.lock().masked = true; }

    fn unmask(&self) {
        self.state.lock().masked = false;
        self.deliver();
    }

    fn is_masked(&self) -> bool { self.state.lock().masked }
}

impl Timer for SimTimer {
    fn now(&self) -> Tick { self.state.lock().now }

    fn set_interrupt_handler(&self, handler: Weak<dyn TickHandler>) -> Result<(), HandlerBusy> {
        let mut state = self.state.lock();
        if state.handler.is_some() {
            return Err(HandlerBusy);
        }
        state.handler = Some(handler);
        info!("Timer handler installed, interval {} ticks", self.config.interval);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::*;

    /// Records the tick reading seen by each delivery.
    #[derive(Default)]
    struct Recorder {
        timer: spin::Once<Arc<SimTimer>>,
        seen: spin::Mutex<Vec<Tick>>,
    }
    impl TickHandler for Recorder {
        fn on_tick(&self) {
            let timer = self.timer.get().unwrap();
            assert!(timer.is_masked());
            self.seen.lock().push(timer.now());
        }
    }

    fn rig(config: SimConfig) -> (Arc<SimTimer>, Arc<Recorder>) {
        let timer = Arc::new(SimTimer::new(config));
        let recorder = Arc::new(Recorder::default());
        recorder.timer.call_once(|| timer.clone());
        let handler: Weak<dyn TickHandler> = Arc::downgrade(&recorder) as Weak<dyn TickHandler>;
        timer.set_interrupt_handler(handler).unwrap();
        (timer, recorder)
    }

    #[test]
    fn tick_advances_by_interval() {
        let (timer, recorder) = rig(SimConfig {
            start: Tick::new(100),
            interval: 10,
        });
        timer.tick();
        timer.tick();
        timer.advance_to(Tick::new(200));

        assert_eq!(*recorder.seen.lock(), [Tick::new(110), Tick::new(120), Tick::new(200)]);
        assert_eq!(timer.delivered(), 3);
        assert!(!timer.is_masked());
    }

    #[test]
    fn masked_interrupt_is_latched_until_unmask() {
        let (timer, recorder) = rig(SimConfig::default());
        timer.mask();
        timer.tick();
        timer.tick();
        assert!(timer.is_pending());
        assert!(recorder.seen.lock().is_empty());

        timer.unmask();
        assert!(!timer.is_pending());
        assert_eq!(*recorder.seen.lock(), [Tick::new(2 * TIMER_TICKS)]);
    }

    #[test]
    fn second_handler_is_refused() {
        let (timer, _recorder) = rig(SimConfig::default());
        let other = Arc::new(Recorder::default());
        let handler: Weak<dyn TickHandler> = Arc::downgrade(&other) as Weak<dyn TickHandler>;
        assert_eq!(timer.set_interrupt_handler(handler), Err(HandlerBusy));
    }

    #[test]
    fn tick_after_handler_dropped_is_discarded() {
        let (timer, recorder) = rig(SimConfig::default());
        drop(recorder);
        timer.tick();
        assert_eq!(timer.delivered(), 0);
        assert_eq!(timer.now(), Tick::new(TIMER_TICKS));
    }

    #[test]
    #[should_panic(expected = "timer must advance")]
    fn zero_advance_panics() { SimTimer::default().advance(0); }
}
