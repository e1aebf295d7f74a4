use rand::Rng;
use tokio::time::Duration;
use tokio::time::Instant;

/// Single-shot election timeout with a randomized duration.
///
/// Every arm (construction or [`reset`](Self::reset)) samples a fresh
/// duration uniformly from `[min, max)`, which desynchronizes candidacies
/// across the cluster.
#[derive(Clone, Debug)]
pub struct ElectionTimer {
    next_deadline: Instant,
    timeout_range: (u64, u64),
}

impl ElectionTimer {
    /// @param: timeout_range: (ELECTION_TIMEOUT_MIN, ELECTION_TIMEOUT_MAX)
    pub fn new(timeout_range: (u64, u64)) -> Self {
        let (min, max) = timeout_range;
        Self {
            next_deadline: Instant::now() + Self::random_duration(min, max),
            timeout_range,
        }
    }

    pub fn reset(&mut self) {
        let (min, max) = self.timeout_range;
        self.next_deadline = Instant::now() + Self::random_duration(min, max);
    }

    /// Forces the timer to expire immediately, used by the manual election
    /// trigger.
    pub fn fire_now(&mut self) {
        self.next_deadline = Instant::now();
    }

    pub fn random_duration(
        min: u64,
        max: u64,
    ) -> Duration {
        let mut rng = rand::thread_rng();
        let timeout = rng.gen_range(min..max);
        Duration::from_millis(timeout)
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn is_expired(&self) -> bool {
        self.next_deadline <= Instant::now()
    }
}
