use tokio::time::Duration;
use tokio::time::Instant;

/// Fixed-period heartbeat ticker for leaders.
///
/// The first deadline is `now`, so a fresh leader broadcasts immediately
/// after winning an election.
#[derive(Clone, Debug)]
pub struct HeartbeatTimer {
    interval: Duration,
    next_deadline: Instant,
}

impl HeartbeatTimer {
    pub fn new(interval_in_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_in_ms),
            next_deadline: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.next_deadline = Instant::now() + self.interval;
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn is_expired(&self) -> bool {
        self.next_deadline <= Instant::now()
    }
}
