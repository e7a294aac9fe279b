use chrono::Duration;
use thiserror::Error;

/// Number of questions drawn for one test.
pub const QUESTIONS_PER_TEST: usize = 50;

/// Time limit for one test (50 minutes).
pub const TIME_LIMIT_SECS: u32 = 3000;

/// In-progress snapshots older than this are ignored.
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

/// While the timer runs, a snapshot is written every this many elapsed seconds.
pub const SNAPSHOT_EVERY_SECS: u32 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per test must be > 0")]
    InvalidQuestionsPerTest,

    #[error("time limit must be > 0")]
    InvalidTimeLimit,

    #[error("snapshot ttl must be positive")]
    InvalidSnapshotTtl,

    #[error("snapshot interval must be between 1 and the time limit")]
    InvalidSnapshotInterval,
}

/// Tunables for a quiz attempt.
///
/// Defaults match the standard test: 50 questions, 50 minutes, snapshots kept
/// for 24 hours and refreshed every 30 seconds of the countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    questions_per_test: usize,
    time_limit_secs: u32,
    snapshot_ttl: Duration,
    snapshot_every_secs: u32,
}

impl QuizSettings {
    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is zero/negative or the snapshot
    /// interval exceeds the time limit.
    pub fn new(
        questions_per_test: usize,
        time_limit_secs: u32,
        snapshot_ttl: Duration,
        snapshot_every_secs: u32,
    ) -> Result<Self, SettingsError> {
        if questions_per_test == 0 {
            return Err(SettingsError::InvalidQuestionsPerTest);
        }
        if time_limit_secs == 0 {
            return Err(SettingsError::InvalidTimeLimit);
        }
        if snapshot_ttl <= Duration::zero() {
            return Err(SettingsError::InvalidSnapshotTtl);
        }
        if snapshot_every_secs == 0 || snapshot_every_secs > time_limit_secs {
            return Err(SettingsError::InvalidSnapshotInterval);
        }

        Ok(Self {
            questions_per_test,
            time_limit_secs,
            snapshot_ttl,
            snapshot_every_secs,
        })
    }

    #[must_use]
    pub fn questions_per_test(&self) -> usize {
        self.questions_per_test
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn snapshot_ttl(&self) -> Duration {
        self.snapshot_ttl
    }

    #[must_use]
    pub fn snapshot_every_secs(&self) -> u32 {
        self.snapshot_every_secs
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            questions_per_test: QUESTIONS_PER_TEST,
            time_limit_secs: TIME_LIMIT_SECS,
            snapshot_ttl: Duration::hours(SNAPSHOT_TTL_HOURS),
            snapshot_every_secs: SNAPSHOT_EVERY_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_standard_test() {
        let settings = QuizSettings::default();
        assert_eq!(settings.questions_per_test(), 50);
        assert_eq!(settings.time_limit_secs(), 3000);
        assert_eq!(settings.snapshot_ttl(), Duration::hours(24));
        assert_eq!(settings.snapshot_every_secs(), 30);
    }

    #[test]
    fn rejects_interval_longer_than_time_limit() {
        let err = QuizSettings::new(50, 20, Duration::hours(1), 30).unwrap_err();
        assert_eq!(err, SettingsError::InvalidSnapshotInterval);
    }

    #[test]
    fn rejects_zero_values() {
        assert_eq!(
            QuizSettings::new(0, 10, Duration::hours(1), 1).unwrap_err(),
            SettingsError::InvalidQuestionsPerTest
        );
        assert_eq!(
            QuizSettings::new(5, 0, Duration::hours(1), 1).unwrap_err(),
            SettingsError::InvalidTimeLimit
        );
        assert_eq!(
            QuizSettings::new(5, 10, Duration::zero(), 1).unwrap_err(),
            SettingsError::InvalidSnapshotTtl
        );
    }
}
