//! Day-bucket marker for expiry sweeps.

/// Remembers the start (unix seconds) of the last bucket that was swept.
///
/// The marker is a plain signed scalar: it accepts any value, including
/// negatives, and defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupScheduler {
    unix_time: i64,
}

impl CleanupScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unix_time(&mut self, unix_time: i64) {
        self.unix_time = unix_time;
    }

    #[must_use]
    pub fn get_unix_time(&self) -> i64 {
        self.unix_time
    }

    /// Whether a block at `unix_time` opens a bucket other than the marked one.
    #[must_use]
    pub fn is_due(&self, unix_time: i64, interval_secs: i64) -> bool {
        bucket_start(unix_time, interval_secs) != self.unix_time
    }
}

/// Start of the `interval_secs` bucket containing `unix_time`.
#[must_use]
pub fn bucket_start(unix_time: i64, interval_secs: i64) -> i64 {
    if interval_secs <= 0 {
        return unix_time;
    }
    unix_time - unix_time.rem_euclid(interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    #[test]
    fn round_trips_any_value() {
        let mut scheduler = CleanupScheduler::new();
        assert_eq!(scheduler.get_unix_time(), 0);
        for value in [1_600_000_000, -5, i64::MIN, i64::MAX, 0] {
            scheduler.set_unix_time(value);
            assert_eq!(scheduler.get_unix_time(), value);
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket_start(0, DAY), 0);
        assert_eq!(bucket_start(DAY - 1, DAY), 0);
        assert_eq!(bucket_start(DAY, DAY), DAY);
        assert_eq!(bucket_start(-1, DAY), -DAY);
    }

    #[test]
    fn due_once_per_bucket() {
        let mut scheduler = CleanupScheduler::new();
        let t = 1_600_000_000;
        assert!(scheduler.is_due(t, DAY));
        scheduler.set_unix_time(bucket_start(t, DAY));
        assert!(!scheduler.is_due(t + 1, DAY));
        assert!(scheduler.is_due(bucket_start(t, DAY) + DAY, DAY));
    }
}
