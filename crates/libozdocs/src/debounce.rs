use std::time::{Duration, Instant};

/// Delay between the last qualifying event and the triggered action.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Trailing-edge debouncer holding at most one pending deadline.
///
/// Every event cancels the pending deadline and starts a new one, so a burst
/// of events collapses into a single firing once the burst settles.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Quiet period required before firing.
    delay: Duration,
    /// When the pending action becomes due.
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record an event at `now`, restarting the timer.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// When the pending action is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether an action is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending action if it is due at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Feed events at the given offsets, polling every millisecond; return the fire count.
    fn count_fires(offsets: &[u64]) -> usize {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        let end = offsets.last().copied().unwrap_or(0) + 2 * DEFAULT_DELAY.as_millis() as u64;
        let mut fired = 0;
        for t in 0..=end {
            let now = start + ms(t);
            if offsets.contains(&t) {
                debouncer.touch(now);
            }
            if debouncer.fire(now) {
                fired += 1;
            }
        }
        fired
    }

    #[test]
    fn test_idle_never_fires() {
        let mut debouncer = Debouncer::default();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(Instant::now() + ms(10_000)));
    }

    #[test]
    fn test_fires_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.touch(start);
        assert!(!debouncer.fire(start + ms(499)));
        assert!(debouncer.fire(start + ms(500)));
        assert!(!debouncer.fire(start + ms(501)));
    }

    #[test]
    fn test_event_restarts_timer() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.touch(start);
        debouncer.touch(start + ms(400));
        assert!(!debouncer.fire(start + ms(600)));
        assert_eq!(debouncer.deadline(), Some(start + ms(900)));
        assert!(debouncer.fire(start + ms(900)));
    }

    #[test]
    fn test_burst_collapses_to_one() {
        assert_eq!(count_fires(&[0, 100, 200, 300, 400, 450, 899]), 1);
    }

    #[test]
    fn test_spaced_events_fire_each() {
        assert_eq!(count_fires(&[0, 600, 1200, 1800]), 4);
    }

    #[test]
    fn test_independent_debouncers() {
        let start = Instant::now();
        let mut a = Debouncer::default();
        let mut b = Debouncer::default();
        a.touch(start);
        b.touch(start + ms(300));
        assert!(a.fire(start + ms(500)));
        assert!(!b.fire(start + ms(500)));
        assert!(b.fire(start + ms(800)));
    }
}
