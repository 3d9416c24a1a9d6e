//! Scheduler configuration.

use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use revu_core::{defaults, Error, Result};

/// Cadence of the scheduled review job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// Once per calendar day at the configured time.
    Daily,
    /// Once per week, on the given weekday at the configured time.
    Weekly(Weekday),
    /// Every N hours, independent of the configured time-of-day.
    EveryHours(u32),
}

/// Complete scheduler configuration.
///
/// `time_of_day` applies to [`ScheduleType::Daily`] and
/// [`ScheduleType::Weekly`]; it is ignored for [`ScheduleType::EveryHours`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub schedule: ScheduleType,
    /// Local wall-clock trigger time for daily and weekly schedules.
    pub time_of_day: NaiveTime,
    /// Upper bound on notes in one review email.
    pub max_notes_per_email: usize,
    /// Candidate cooldown passed to the note store.
    pub min_days_between_sends: i64,
    /// Trigger-loop polling interval in seconds.
    pub check_interval_seconds: u64,
    /// Retries after a failed job attempt, in addition to the first attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts in seconds.
    pub retry_delay_seconds: u64,
    /// How long a graceful stop waits for an in-flight job.
    pub shutdown_timeout_seconds: u64,
    /// Completed executions retained for status queries.
    pub history_limit: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleType::Daily,
            time_of_day: NaiveTime::from_hms_opt(9, 0, 0).expect("valid trigger time"),
            max_notes_per_email: defaults::MAX_NOTES,
            min_days_between_sends: defaults::MIN_DAYS_BETWEEN_SENDS,
            check_interval_seconds: defaults::CHECK_INTERVAL_SECS,
            max_retries: defaults::JOB_MAX_RETRIES,
            retry_delay_seconds: defaults::JOB_RETRY_DELAY_SECS,
            shutdown_timeout_seconds: defaults::SHUTDOWN_TIMEOUT_SECS,
            history_limit: defaults::JOB_HISTORY_LIMIT,
        }
    }
}

impl ScheduleConfig {
    /// Set the schedule cadence.
    pub fn with_schedule(mut self, schedule: ScheduleType) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the local trigger time for daily and weekly schedules.
    pub fn with_time_of_day(mut self, time: NaiveTime) -> Self {
        self.time_of_day = time;
        self
    }

    /// Set the per-email note cap.
    pub fn with_max_notes_per_email(mut self, max: usize) -> Self {
        self.max_notes_per_email = max;
        self
    }

    /// Set the candidate cooldown in days.
    pub fn with_min_days_between_sends(mut self, days: i64) -> Self {
        self.min_days_between_sends = days;
        self
    }

    /// Set the trigger-loop polling interval in seconds.
    pub fn with_check_interval(mut self, seconds: u64) -> Self {
        self.check_interval_seconds = seconds;
        self
    }

    /// Set the retry count for failed attempts.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the delay between attempts in seconds.
    pub fn with_retry_delay(mut self, seconds: u64) -> Self {
        self.retry_delay_seconds = seconds;
        self
    }

    /// Set the graceful shutdown wait in seconds.
    pub fn with_shutdown_timeout(mut self, seconds: u64) -> Self {
        self.shutdown_timeout_seconds = seconds;
        self
    }

    /// Set how many finished executions to retain.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Validate structural constraints.
    pub fn validate(&self) -> Result<()> {
        if self.max_notes_per_email == 0 {
            return Err(Error::Config(
                "max_notes_per_email must be positive".into(),
            ));
        }
        if self.check_interval_seconds == 0 {
            return Err(Error::Config(
                "check_interval_seconds must be positive".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(Error::Config("history_limit must be positive".into()));
        }
        if let ScheduleType::EveryHours(0) = self.schedule {
            return Err(Error::Config(
                "every_hours schedule requires a positive hour count".into(),
            ));
        }
        Ok(())
    }

    /// Trigger-loop polling interval.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Delay between job attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Graceful shutdown wait.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ScheduleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule, ScheduleType::Daily);
        assert_eq!(config.check_interval(), Duration::from_secs(60));
    }

    #[test]
    fn builder_chaining() {
        let config = ScheduleConfig::default()
            .with_schedule(ScheduleType::Weekly(Weekday::Mon))
            .with_time_of_day(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
            .with_max_notes_per_email(3)
            .with_min_days_between_sends(14)
            .with_check_interval(5)
            .with_max_retries(1)
            .with_retry_delay(10)
            .with_shutdown_timeout(5)
            .with_history_limit(10);

        assert_eq!(config.schedule, ScheduleType::Weekly(Weekday::Mon));
        assert_eq!(config.max_notes_per_email, 3);
        assert_eq!(config.min_days_between_sends, 14);
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn zero_notes_rejected() {
        let config = ScheduleConfig::default().with_max_notes_per_email(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_check_interval_rejected() {
        let config = ScheduleConfig::default().with_check_interval(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_limit_rejected() {
        let config = ScheduleConfig::default().with_history_limit(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_hour_schedule_rejected() {
        let config = ScheduleConfig::default().with_schedule(ScheduleType::EveryHours(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn schedule_type_serde_shape() {
        let json = serde_json::to_string(&ScheduleType::Daily).unwrap();
        assert_eq!(json, "\"daily\"");

        let json = serde_json::to_string(&ScheduleType::EveryHours(6)).unwrap();
        assert_eq!(json, "{\"every_hours\":6}");

        let back: ScheduleType = serde_json::from_str("{\"weekly\":\"Mon\"}").unwrap();
        assert_eq!(back, ScheduleType::Weekly(Weekday::Mon));
    }
}
