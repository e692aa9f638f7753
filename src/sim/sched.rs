use alloc::collections::VecDeque;

use derive_more::derive::{Display, From, Into};
use hashbrown::HashMap;

use crate::common::log::{debug, error, trace};
use crate::interrupt::IntrptGuard;
use crate::sched::{Scheduler, ThreadState};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[display("thread#{_0}")]
pub struct ThreadId(u32);
impl ThreadId {
    /// Runs when nothing else is ready. Never queued, never blocks.
    pub const IDLE: Self = Self(0);
}

struct SchedState {
    threads: HashMap<ThreadId, ThreadState>,
    ready: VecDeque<ThreadId>,
    running: ThreadId,
    next_id: u32,
    yields: usize,
}
impl SchedState {
    fn requeue(&mut self, thread: ThreadId) {
        self.threads.insert(thread, ThreadState::Ready);
        if thread != ThreadId::IDLE {
            self.ready.push_back(thread);
        }
    }

    fn switch_next(&mut self) {
        let next = self.ready.pop_front().unwrap_or(ThreadId::IDLE);
        self.threads.insert(next, ThreadState::Running);
        trace!("Switching {} -> {next}", self.running);
        self.running = next;
    }
}

/// A single CPU FIFO scheduler over thread ids.
pub struct SimScheduler {
    state: spin::Mutex<SchedState>,
}
impl SimScheduler {
    /// A scheduler with only the idle thread, which is running.
    pub fn new() -> Self {
        let mut threads = HashMap::new();
        threads.insert(ThreadId::IDLE, ThreadState::Running);
        Self {
            state: spin::Mutex::new(SchedState {
                threads,
                ready: VecDeque::new(),
                running: ThreadId::IDLE,
                next_id: 1,
                yields: 0,
            }),
        }
    }

    /// Add a new thread at the back of the ready queue.
    pub fn spawn(&self) -> ThreadId {
        let mut state = self.state.lock();
        let thread = ThreadId(state.next_id);
        state.next_id += 1;
        state.requeue(thread);
        thread
    }

    /// Run `thread` now, putting the running thread back on the ready queue.
    /// Does nothing if `thread` is already running.
    ///
    /// # Panics
    /// If `thread` is neither ready nor running.
    pub fn switch_to(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        if state.running == thread {
            return;
        }
        assert_eq!(
            state.threads.get(&thread),
            Some(&ThreadState::Ready),
            "{thread} is not ready"
        );
        state.ready.retain(|&queued| queued != thread);
        let prev = state.running;
        state.requeue(prev);
        state.threads.insert(thread, ThreadState::Running);
        state.running = thread;
    }

    pub fn state(&self, thread: ThreadId) -> Option<ThreadState> {
        self.state.lock().threads.get(&thread).copied()
    }

    pub fn running(&self) -> ThreadId { self.state.lock().running }

    pub fn ready_len(&self) -> usize { self.state.lock().ready.len() }

    /// Number of [`Scheduler::yield_current`] calls so far.
    pub fn yields(&self) -> usize { self.state.lock().yields }
}

impl Default for SimScheduler {
    fn default() -> Self { Self::new() }
}

impl Scheduler for SimScheduler {
    type Thread = ThreadId;

    fn current(&self) -> ThreadId { self.running() }

    fn can_block(&self, thread: &ThreadId) -> bool { *thread != ThreadId::IDLE }

    fn yield_current(&self) {
        let mut state = self.state.lock();
        state.yields += 1;
        if state.ready.is_empty() {
            return;
        }
        let cur = state.running;
        state.requeue(cur);
        state.switch_next();
    }

    fn reschedule(&self, new_state: ThreadState, intrpt: IntrptGuard<'_>) {
        {
            let mut state = self.state.lock();
            let cur = state.running;
            match new_state {
                ThreadState::Running => return,
                ThreadState::Ready => {
                    if state.ready.is_empty() {
                        return;
                    }
                    state.requeue(cur);
                }
                ThreadState::Blocked => {
                    assert_ne!(cur, ThreadId::IDLE, "idle thread cannot block");
                    state.threads.insert(cur, ThreadState::Blocked);
                }
            }
            debug!("{cur} rescheduled as {new_state}");
            state.switch_next();
        }
        // The switch is immediate here, so the guard goes right away.
        drop(intrpt);
    }

    fn mark_ready(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        let current = state.threads.get(&thread).copied();
        match current {
            Some(ThreadState::Blocked) => state.requeue(thread),
            Some(_) => {}
            None => error!("mark_ready on unknown {thread}"),
        }
    }
}
