use alloc::boxed::Box;

use intrusive_collections::{intrusive_adapter, LinkedList, LinkedListLink};

use crate::interrupt::timer::Tick;

struct SleepRecord<T> {
    link: LinkedListLink,
    thread: T,
    wake_time: Tick,
}
impl<T> SleepRecord<T> {
    fn is_due(&self, now: Tick) -> bool { self.wake_time <= now }
}

intrusive_adapter!(SleepAdapter<T> = Box<SleepRecord<T>>: SleepRecord<T> { link: LinkedListLink });

/// Threads that have put themselves to sleep, with the tick they wake at.
///
/// A thread appears at most once. The registry does not synchronize itself;
/// the owner serializes inserts against [`Registry::drain_due`].
pub struct Registry<T> {
    sleeping: LinkedList<SleepAdapter<T>>,
    len: usize,
}
impl<T: PartialEq> Registry<T> {
    pub fn new() -> Self {
        Self {
            sleeping: LinkedList::new(SleepAdapter::new()),
            len: 0,
        }
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn contains(&self, thread: &T) -> bool { self.wake_time(thread).is_some() }

    pub fn wake_time(&self, thread: &T) -> Option<Tick> {
        self.sleeping
            .iter()
            .find(|record| record.thread == *thread)
            .map(|record| record.wake_time)
    }

    /// The earliest tick at which some thread is due.
    pub fn next_wake_time(&self) -> Option<Tick> {
        self.sleeping.iter().map(|record| record.wake_time).min()
    }

    /// Register `thread` to wake at `wake_time`.
    ///
    /// Hands the thread back if it is already sleeping.
    pub fn insert(&mut self, thread: T, wake_time: Tick) -> Result<(), T> {
        if self.contains(&thread) {
            return Err(thread);
        }
        self.sleeping.push_back(Box::new(SleepRecord {
            link: LinkedListLink::new(),
            thread,
            wake_time,
        }));
        self.len += 1;
        Ok(())
    }

    /// Unlink every record whose wake time is at or before `now`.
    ///
    /// Records that are not due stay where they are.
    pub fn drain_due(&mut self, now: Tick) -> Woken<T> {
        let mut woken = LinkedList::new(SleepAdapter::new());
        let mut cursor = self.sleeping.front_mut();
        while let Some(record) = cursor.get() {
            if !record.is_due(now) {
                cursor.move_next();
                continue;
            }
            if let Some(record) = cursor.remove() {
                woken.push_back(record);
                self.len -= 1;
            }
        }
        Woken { records: woken }
    }
}

impl<T: PartialEq> Default for Registry<T> {
    fn default() -> Self { Self::new() }
}

/// Records unlinked by [`Registry::drain_due`], as `(thread, wake_time)`.
pub struct Woken<T> {
    records: LinkedList<SleepAdapter<T>>,
}
impl<T> Iterator for Woken<T> {
    type Item = (T, Tick);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.pop_front()?;
        let SleepRecord {
            thread, wake_time, ..
        } = *record;
        Some((thread, wake_time))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn drained(reg: &mut Registry<u32>, now: u64) -> Vec<u32> {
        let mut threads: Vec<u32> = reg.drain_due(Tick::new(now)).map(|(t, _)| t).collect();
        threads.sort_unstable();
        threads
    }

    #[test]
    fn wakes_at_exact_wake_time() {
        let mut reg = Registry::new();
        reg.insert(1, Tick::new(150)).unwrap();

        assert!(drained(&mut reg, 149).is_empty());
        assert!(reg.contains(&1));
        assert_eq!(drained(&mut reg, 150), [1]);
        assert!(reg.is_empty());
    }

    #[test]
    fn keeps_records_not_yet_due() {
        let mut reg = Registry::new();
        reg.insert(1, Tick::new(10)).unwrap();
        reg.insert(2, Tick::new(30)).unwrap();
        reg.insert(3, Tick::new(20)).unwrap();
        reg.insert(4, Tick::new(5)).unwrap();

        assert_eq!(drained(&mut reg, 20), [1, 3, 4]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.wake_time(&2), Some(Tick::new(30)));
        assert_eq!(reg.wake_time(&1), None);
    }

    #[test]
    fn second_drain_at_same_time_wakes_nothing() {
        let mut reg = Registry::new();
        reg.insert(1, Tick::new(10)).unwrap();
        reg.insert(2, Tick::new(11)).unwrap();

        assert_eq!(drained(&mut reg, 10), [1]);
        assert!(drained(&mut reg, 10).is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn same_wake_time_wakes_together() {
        let mut reg = Registry::new();
        reg.insert(7, Tick::new(40)).unwrap();
        reg.insert(8, Tick::new(40)).unwrap();

        assert!(drained(&mut reg, 39).is_empty());
        assert_eq!(drained(&mut reg, 41), [7, 8]);
    }

    #[test]
    fn rejects_thread_already_sleeping() {
        let mut reg = Registry::new();
        reg.insert(1, Tick::new(10)).unwrap();

        assert_eq!(reg.insert(1, Tick::new(99)), Err(1));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.wake_time(&1), Some(Tick::new(10)));

        drained(&mut reg, 10);
        assert!(reg.insert(1, Tick::new(99)).is_ok());
    }

    #[test]
    fn next_wake_time_is_earliest() {
        let mut reg = Registry::new();
        assert_eq!(reg.next_wake_time(), None);
        reg.insert(1, Tick::new(30)).unwrap();
        reg.insert(2, Tick::new(12)).unwrap();
        assert_eq!(reg.next_wake_time(), Some(Tick::new(12)));
    }

    #[test]
    fn woken_reports_wake_time() {
        let mut reg = Registry::new();
        reg.insert(5, Tick::new(3)).unwrap();
        let woken: Vec<_> = reg.drain_due(Tick::new(100)).collect();
        assert_eq!(woken, [(5, Tick::new(3))]);
    }
}
