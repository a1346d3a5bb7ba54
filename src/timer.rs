use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

/// Handle returned by [`TimerQueue::schedule_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueTimer<E> {
    pub id: TimerId,
    pub deadline: Duration,
    pub event: E,
}

/// Single-threaded one-shot timer queue on a monotonic timeline.
///
/// Timestamps are offsets from an arbitrary origin chosen by the owner. Timers fire in deadline
/// order; equal deadlines fire in scheduling order. A cancelled timer never fires.
#[derive(Debug)]
pub struct TimerQueue<E> {
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), E>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule_at(&mut self, deadline: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((deadline, id), event);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Returns `true` if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<DueTimer<E>> {
        let (deadline, id) = *self.pending.keys().next()?;
        if deadline > now {
            return None;
        }
        let event = self.pending.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some(DueTimer {
            id,
            deadline,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule_at(ms(20), "b");
        q.schedule_at(ms(10), "a");
        q.schedule_at(ms(20), "c");

        let mut fired = Vec::new();
        while let Some(t) = q.pop_due(ms(100)) {
            fired.push(t.event);
        }
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule_at(ms(50), ());
        assert!(q.pop_due(ms(49)).is_none());
        assert_eq!(q.next_deadline(), Some(ms(50)));
        assert!(q.pop_due(ms(50)).is_some());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule_at(ms(10), 1);
        let b = q.schedule_at(ms(10), 2);
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert!(!q.is_pending(a));
        assert!(q.is_pending(b));

        let t = q.pop_due(ms(10)).unwrap();
        assert_eq!((t.id, t.event), (b, 2));
        assert!(q.pop_due(ms(1000)).is_none());
    }
}
