/// Deferred work for a single-threaded host loop.
///
/// Nothing here sleeps. Callers schedule a task at an instant and later
/// hand the timeline the current time; every task whose instant has passed
/// comes back out in due order, ties in scheduling order.
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<T> {
    due: Instant,
    seq: u64,
    task: T,
}

#[derive(Debug)]
pub struct Timeline<T> {
    entries: Vec<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> Timeline<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, task: T) {
        self.entries.push(Entry {
            due,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, task: T) {
        self.schedule(now + delay, task);
    }

    /// Remove and return the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)?;
        Some(self.entries.remove(pos).task)
    }

    /// Remove and return every task regardless of its instant, in due order.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.entries.sort_by_key(|e| (e.due, e.seq));
        self.entries.drain(..).map(|e| e.task).collect()
    }

    /// Drop the tasks for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|e| keep(&e.task));
    }

    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.due).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_order() {
        let t0 = Instant::now();
        let mut tl = Timeline::new();
        tl.schedule_after(t0, Duration::from_millis(50), "b");
        tl.schedule_after(t0, Duration::from_millis(10), "a");
        tl.schedule_after(t0, Duration::from_millis(50), "c");

        assert_eq!(tl.pop_due(t0), None);
        assert_eq!(tl.next_due(), Some(t0 + Duration::from_millis(10)));

        let later = t0 + Duration::from_millis(60);
        assert_eq!(tl.pop_due(later), Some("a"));
        assert_eq!(tl.pop_due(later), Some("b"));
        assert_eq!(tl.pop_due(later), Some("c"));
        assert!(tl.is_empty());
    }

    #[test]
    fn test_retain_and_drain() {
        let t0 = Instant::now();
        let mut tl = Timeline::new();
        tl.schedule_after(t0, Duration::from_secs(2), 2);
        tl.schedule_after(t0, Duration::from_secs(1), 1);
        tl.schedule_after(t0, Duration::from_secs(3), 3);
        tl.retain(|&n| n != 3);
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.drain_all(), vec![1, 2]);
        assert!(tl.is_empty());
    }
}
