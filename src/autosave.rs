use std::time::Duration;

use crate::timer::{TimerId, TimerQueue};

/// Trailing-edge debounce: every `touch` pushes the flush back to `now + delay`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerId>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn touch<E>(&mut self, timers: &mut TimerQueue<E>, now: Duration, event: E) -> TimerId {
        self.cancel(timers);
        let id = timers.schedule_at(now + self.delay, event);
        self.pending = Some(id);
        id
    }

    /// Consume a fired timer. Returns `true` if it is the flush this debouncer is waiting for.
    pub fn on_fired(&mut self, fired: TimerId) -> bool {
        if self.pending == Some(fired) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel<E>(&mut self, timers: &mut TimerQueue<E>) -> bool {
        match self.pending.take() {
            Some(id) => timers.cancel(id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_of_touches_yields_one_flush() {
        let mut timers = TimerQueue::new();
        let mut d = Debouncer::new(Duration::from_millis(1000));
        for t in [0u64, 200, 400, 900] {
            d.touch(&mut timers, Duration::from_millis(t), ());
        }
        assert_eq!(timers.len(), 1);
        assert!(timers.pop_due(Duration::from_millis(1899)).is_none());

        let due = timers.pop_due(Duration::from_millis(1900)).unwrap();
        assert!(d.on_fired(due.id));
        assert!(!d.is_pending());
    }

    #[test]
    fn cancel_drops_pending_flush() {
        let mut timers = TimerQueue::new();
        let mut d = Debouncer::new(Duration::from_millis(10));
        let id = d.touch(&mut timers, Duration::ZERO, ());
        assert!(d.cancel(&mut timers));
        assert!(!timers.is_pending(id));
        assert!(!d.on_fired(id));
    }
}
