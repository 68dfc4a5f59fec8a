//! Cancellable one-shot timers
//!
//! Every delayed action in the engine (debounced progress writes, the
//! post-answer resume, the auto-advance countdown) is a [`Timer`] owned by the
//! component it belongs to. Arming a timer supersedes whatever was pending, so
//! there is never more than one pending action per timer.
//!
//! Time is always passed in by the caller, which keeps the state machines free
//! of clocks and lets tests step time deterministically.

use std::time::{Duration, Instant};

/// A one-shot timer carrying a payload that is handed back when it fires
#[derive(Debug, Clone)]
pub struct Timer<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Timer<T> {
    /// Create an idle timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer to fire `delay` after `now`, replacing any pending payload
    pub fn arm(&mut self, now: Instant, delay: Duration, payload: T) {
        self.pending = Some((now + delay, payload));
    }

    /// Replace the payload of a pending timer without moving its deadline.
    ///
    /// Arms the timer if nothing is pending. Returns true if a pending
    /// payload was replaced.
    pub fn coalesce(&mut self, now: Instant, delay: Duration, payload: T) -> bool {
        match self.pending.as_mut() {
            Some((_, pending)) => {
                *pending = payload;
                true
            }
            None => {
                self.arm(now, delay, payload);
                false
            }
        }
    }

    /// Cancel the timer, returning the payload that will no longer fire
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    /// Fire the timer if its deadline has been reached
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((deadline, _)) if now >= deadline => self.cancel(),
            _ => None,
        }
    }

    /// The payload waiting to fire
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, payload)| payload)
    }

    /// Whether a payload is waiting to fire
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending payload will fire
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Time left until the pending payload fires
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn fires_once_at_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.arm(start, 2 * SECOND, "write");

        assert_eq!(timer.poll(start + SECOND), None);
        assert_eq!(timer.poll(start + 2 * SECOND), Some("write"));
        assert_eq!(timer.poll(start + 3 * SECOND), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn arming_supersedes_pending_payload() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.arm(start, 2 * SECOND, 1);
        timer.arm(start + SECOND, 2 * SECOND, 2);

        assert_eq!(timer.poll(start + 2 * SECOND), None);
        assert_eq!(timer.poll(start + 3 * SECOND), Some(2));
    }

    #[test]
    fn coalesce_keeps_first_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        assert!(!timer.coalesce(start, 2 * SECOND, 10));
        assert!(timer.coalesce(start + SECOND, 2 * SECOND, 20));

        assert_eq!(timer.deadline(), Some(start + 2 * SECOND));
        assert_eq!(timer.poll(start + 2 * SECOND), Some(20));
    }

    #[test]
    fn cancel_prevents_firing() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.arm(start, SECOND, ());

        assert_eq!(timer.cancel(), Some(()));
        assert_eq!(timer.poll(start + 5 * SECOND), None);
        assert_eq!(timer.remaining(start), None);
    }
}
