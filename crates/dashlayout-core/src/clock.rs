//! Injectable time source and the coordinator's safety timer.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Monotonic time elapsed since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// One-shot deadline that can be cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyTimer {
    deadline: Option<Duration>,
}

impl SafetyTimer {
    /// Arm the timer to fire `timeout` after `now`. Re-arming an armed timer is a no-op.
    pub fn arm(&mut self, now: Duration, timeout: Duration) {
        if self.deadline.is_none() {
            self.deadline = Some(now + timeout);
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Whether the deadline has passed at `now`.
    pub fn expired(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), Duration::from_millis(250));
    }

    #[test]
    fn test_timer_fires_once_armed() {
        let mut timer = SafetyTimer::default();
        assert!(!timer.expired(Duration::from_secs(100)));

        timer.arm(Duration::from_millis(100), Duration::from_millis(5000));
        timer.arm(Duration::from_millis(900), Duration::from_millis(5000));
        assert_eq!(timer.deadline(), Some(Duration::from_millis(5100)));
        assert!(!timer.expired(Duration::from_millis(5099)));
        assert!(timer.expired(Duration::from_millis(5100)));

        timer.cancel();
        assert!(!timer.expired(Duration::from_secs(60)));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
