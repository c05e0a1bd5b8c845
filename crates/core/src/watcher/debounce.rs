//! Single-shot coalescing timer.

use std::time::{Duration, Instant};

/// Collapses bursts of triggers into one firing.
///
/// Every [`schedule`](Debouncer::schedule) restarts the window; the timer
/// fires once, on the first [`poll`](Debouncer::poll) past the deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, deadline: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once per window, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bursts_collapse() {
        let start = Instant::now();
        let mut timer = Debouncer::new(Duration::from_millis(200));

        timer.schedule(start);
        timer.schedule(start + Duration::from_millis(150));

        assert!(!timer.poll(start + Duration::from_millis(300)));
        assert!(timer.poll(start + Duration::from_millis(350)));
        assert!(!timer.poll(start + Duration::from_millis(400)));
        assert!(!timer.is_active());
    }

    #[test]
    fn test_idle_timer_never_fires() {
        let mut timer = Debouncer::new(Duration::from_millis(10));
        assert!(!timer.poll(Instant::now() + Duration::from_secs(5)));
    }
}
