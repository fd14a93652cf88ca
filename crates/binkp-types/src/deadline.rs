//! Absolute time bounds for frame- and session-level timeouts.

use std::time::{Duration, Instant};

/// An absolute point in time by which a blocking operation must complete.
///
/// Frame reads/writes and whole sessions are bounded by a `Deadline`
/// rather than a relative `Duration`, so that a read that consumes part
/// of its allowance (say, the 2-byte header) leaves the rest of the
/// budget for the payload read that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left until the deadline, or `Duration::ZERO` if it has passed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_shrinks_towards_zero() {
        let d = Deadline::after(Duration::from_millis(50));
        assert!(d.remaining() <= Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(60));
        assert!(d.is_expired());
        assert_eq!(d.remaining(), Duration::ZERO);
    }
}
