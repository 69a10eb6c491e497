//! What the consumption loop waits on between cycles.

use std::time::{Duration, Instant};

use crate::shutdown::Shutdown;

/// Longest single sleep, so shutdown requests are seen promptly.
pub const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Blocks until the next cycle should run.
pub trait Wakeup {
    /// Returns `false` if the loop should stop instead of running again.
    fn wait(&mut self, shutdown: &Shutdown) -> bool;
}

/// Fixed-interval polling.
#[derive(Debug, Clone)]
pub struct IntervalWakeup {
    interval: Duration,
}

impl IntervalWakeup {
    pub fn new(interval: Duration) -> Self {
        IntervalWakeup { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Wakeup for IntervalWakeup {
    fn wait(&mut self, shutdown: &Shutdown) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if shutdown.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Wakes a fixed number of times, then stops. Used by `process --once`.
#[derive(Debug, Clone)]
pub struct CountedWakeup {
    remaining: usize,
}

impl CountedWakeup {
    pub fn new(cycles_after_first: usize) -> Self {
        CountedWakeup {
            remaining: cycles_after_first,
        }
    }
}

impl Wakeup for CountedWakeup {
    fn wait(&mut self, shutdown: &Shutdown) -> bool {
        if shutdown.is_requested() || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_wakeup_returns_after_interval() {
        let mut wakeup = IntervalWakeup::new(Duration::from_millis(20));
        let start = Instant::now();
        assert!(wakeup.wait(&Shutdown::new()));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn interval_wakeup_stops_on_shutdown() {
        let mut wakeup = IntervalWakeup::new(Duration::from_secs(3600));
        let shutdown = Shutdown::new();
        shutdown.request();
        assert!(!wakeup.wait(&shutdown));
    }

    #[test]
    fn counted_wakeup_runs_out() {
        let mut wakeup = CountedWakeup::new(2);
        let shutdown = Shutdown::new();
        assert!(wakeup.wait(&shutdown));
        assert!(wakeup.wait(&shutdown));
        assert!(!wakeup.wait(&shutdown));
    }
}
