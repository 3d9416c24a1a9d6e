//! Job execution records and aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// What started a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Scheduled,
    Manual,
}

/// One job execution, from creation through its terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Uuid,
    pub trigger: JobTrigger,
    pub status: JobStatus,
    /// Set when the first attempt begins.
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Retries performed so far, excluding the first attempt.
    pub retry_count: u32,
    /// Candidates fetched for the successful attempt.
    pub notes_processed: usize,
    /// Emails delivered; at most one per job.
    pub emails_sent: usize,
    /// Message from the final failed attempt.
    pub error_message: Option<String>,
}

impl JobExecution {
    pub fn new(id: Uuid, trigger: JobTrigger) -> Self {
        Self {
            id,
            trigger,
            status: JobStatus::Pending,
            started_at: None,
            finished_at: None,
            retry_count: 0,
            notes_processed: 0,
            emails_sent: 0,
            error_message: None,
        }
    }

    /// Wall-clock duration in milliseconds, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Aggregate view over retained job history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatistics {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub cancelled_jobs: usize,
    /// Completed fraction of all retained jobs, 0.0 when history is empty.
    pub success_rate: f64,
    /// Mean duration of completed jobs.
    pub avg_duration_ms: Option<f64>,
}

impl JobStatistics {
    /// Compute statistics over finished executions.
    pub fn from_history<'a, I>(history: I) -> Self
    where
        I: IntoIterator<Item = &'a JobExecution>,
    {
        let mut stats = Self::default();
        let mut duration_sum = 0i64;
        let mut duration_count = 0usize;

        for job in history {
            stats.total_jobs += 1;
            match job.status {
                JobStatus::Completed => {
                    stats.completed_jobs += 1;
                    if let Some(ms) = job.duration_ms() {
                        duration_sum += ms;
                        duration_count += 1;
                    }
                }
                JobStatus::Failed => stats.failed_jobs += 1,
                JobStatus::Cancelled => stats.cancelled_jobs += 1,
                JobStatus::Pending | JobStatus::Running => {}
            }
        }

        if stats.total_jobs > 0 {
            stats.success_rate = stats.completed_jobs as f64 / stats.total_jobs as f64;
        }
        if duration_count > 0 {
            stats.avg_duration_ms = Some(duration_sum as f64 / duration_count as f64);
        }

        stats
    }
}

/// Point-in-time snapshot of the scheduler, published atomically.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    /// False once a stop has completed.
    pub running: bool,
    pub shutdown_requested: bool,
    /// The in-flight job, if any.
    pub current_job: Option<JobExecution>,
    /// Finished executions, most recent first, bounded by the history limit.
    pub history: Vec<JobExecution>,
    pub statistics: JobStatistics,
}
