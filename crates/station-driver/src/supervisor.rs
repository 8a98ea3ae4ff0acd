use tokio::time::{Duration, Instant};

// ─── Watchdog ─────────────────────────────────────────────────────────────

/// Default silence interval before a session gets kicked.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(20);

/// Default number of kicks before a session gives up.
pub const DEFAULT_MAX_KICKS: u32 = 1;

/// Effectively-unbounded interval for protocol-driven sessions: data-driven
/// transitions do the real work, the watchdog is a last resort.
pub const STRUCTURED_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);

/// Dead-man's switch for one device conversation.
///
/// There is exactly one deadline at a time: the owning session sleeps until
/// [`deadline`](Watchdog::deadline) in its select loop, so deadlines never
/// nest. Every send and every receive [`rearm`](Watchdog::rearm)s it, which
/// also zeroes the kick counter.
///
/// On expiry the session calls [`note_expiry`](Watchdog::note_expiry), runs
/// the protocol's kick hook, and then checks [`exhausted`](Watchdog::exhausted):
/// a kick that transmits rearms along the way and thereby survives the
/// check; a kick that stays silent does not, and the session fails its
/// pending bins and tears down.
#[derive(Debug)]
pub struct Watchdog {
    interval: Duration,
    max_kicks: u32,
    kicks: u32,
    deadline: Instant,
}

impl Watchdog {
    pub fn new(interval: Duration, max_kicks: u32) -> Self {
        Self {
            interval,
            max_kicks,
            kicks: 0,
            deadline: Instant::now() + interval,
        }
    }

    /// Reschedule the deadline one interval out and zero the kick counter.
    /// Idempotent: calling it repeatedly before expiry just moves the single
    /// deadline.
    pub fn rearm(&mut self) {
        self.kicks = 0;
        self.deadline = Instant::now() + self.interval;
    }

    /// The instant the owning session sleeps until.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Record a deadline expiry and schedule the next one.
    pub fn note_expiry(&mut self) {
        self.kicks += 1;
        self.deadline = Instant::now() + self.interval;
    }

    pub fn exhausted(&self) -> bool {
        self.kicks >= self.max_kicks
    }

    pub fn kicks(&self) -> u32 {
        self.kicks
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_zeroes_the_kick_counter() {
        let mut dog = Watchdog::new(Duration::from_secs(20), 1);
        dog.note_expiry();
        assert!(dog.exhausted());

        dog.rearm();
        assert!(!dog.exhausted());
        assert_eq!(dog.kicks(), 0);
    }

    #[test]
    fn repeated_rearms_keep_one_deadline() {
        let mut dog = Watchdog::new(Duration::from_secs(20), 1);
        dog.rearm();
        let first = dog.deadline();
        dog.rearm();
        let second = dog.deadline();
        // Still a single future deadline, only rescheduled
        assert!(second >= first);
        assert_eq!(dog.kicks(), 0);
    }

    #[test]
    fn expiry_without_rearm_exhausts_at_max() {
        let mut dog = Watchdog::new(Duration::from_secs(20), 2);
        dog.note_expiry();
        assert!(!dog.exhausted());
        dog.note_expiry();
        assert!(dog.exhausted());
    }

    #[test]
    fn expiry_pushes_the_deadline_forward() {
        let mut dog = Watchdog::new(Duration::from_secs(20), 1);
        let before = dog.deadline();
        dog.note_expiry();
        assert!(dog.deadline() >= before);
    }
}
