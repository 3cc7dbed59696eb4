//! Cancelable one-shot deadline.
//!
//! At most one deadline is armed at a time; arming hands out a fresh
//! [`TimerHandle`], so a handle captured before a cancel or re-arm can
//! never fire the newer deadline.

use std::time::Duration;

/// Identifies one arming of a [`OneShotTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Clone, Copy, Debug)]
struct Armed {
    handle: TimerHandle,
    due:    Duration,
}

#[derive(Debug, Default)]
pub struct OneShotTimer {
    next_id: u64,
    armed:   Option<Armed>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `now + delay`, replacing any armed deadline.
    pub fn arm(&mut self, now: Duration, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.armed = Some(Armed { handle, due: now + delay });
        handle
    }

    /// Disarm. Returns whether anything was armed; calling twice is harmless.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.armed.map(|a| a.handle)
    }

    pub fn due(&self) -> Option<Duration> {
        self.armed.map(|a| a.due)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Disarm and return the handle if the deadline has passed at `now`.
    pub fn take_elapsed(&mut self, now: Duration) -> Option<TimerHandle> {
        match self.armed {
            Some(a) if now >= a.due => {
                self.armed = None;
                Some(a.handle)
            }
            _ => None,
        }
    }

    /// Fire `handle` early. Stale handles are ignored and return false.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        match self.armed {
            Some(a) if a.handle == handle => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn elapses_at_deadline() {
        let mut t = OneShotTimer::new();
        let h = t.arm(ms(0), ms(300));
        assert_eq!(t.take_elapsed(ms(299)), None);
        assert_eq!(t.take_elapsed(ms(300)), Some(h));
        assert!(!t.is_armed());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut t = OneShotTimer::new();
        t.arm(ms(0), ms(10));
        assert!(t.cancel());
        assert!(!t.cancel());
        assert_eq!(t.take_elapsed(ms(1_000)), None);
    }

    #[test]
    fn stale_handle_cannot_fire_rearmed_timer() {
        let mut t = OneShotTimer::new();
        let old = t.arm(ms(0), ms(10));
        t.cancel();
        let new = t.arm(ms(5), ms(10));
        assert_ne!(old, new);
        assert!(!t.fire(old));
        assert!(t.is_armed());
        assert!(t.fire(new));
        assert!(!t.is_armed());
    }
}
