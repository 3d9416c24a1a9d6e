//! Background scheduler driving periodic note review jobs.
//!
//! Two tasks cooperate over channels:
//!
//! - A trigger loop polls the wall clock at a fixed interval and fires at
//!   most one run per matching schedule window.
//! - A job runner owns all mutable job state (selector, history) and
//!   executes one job at a time, publishing status snapshots through a
//!   watch channel.
//!
//! Single-flight is enforced by an atomic busy latch acquired before a run
//! message is queued, by both the trigger loop and manual triggers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use revu_core::{defaults, Error, NoteStore, Result, SendRecord};
use revu_select::{ContentAnalyzer, SelectionAlgorithm, SelectionCriteria};

use crate::config::{ScheduleConfig, ScheduleType};
use crate::deliver::Deliverer;
use crate::job::{JobExecution, JobStatistics, JobStatus, JobTrigger, SchedulerStatus};

enum RunnerMessage {
    Run { id: Uuid, trigger: JobTrigger },
    Shutdown,
}

/// State shared between the handle, the trigger loop, and the job runner.
struct Shared {
    /// Single-flight latch. Held from trigger acceptance until the final
    /// status publish of the run.
    busy: AtomicBool,
    shutdown: AtomicBool,
    /// Set when a forced shutdown has abandoned the runner; its later
    /// status publishes are discarded.
    detached: AtomicBool,
    status_tx: watch::Sender<SchedulerStatus>,
}

/// Builder for [`NoteScheduler`].
pub struct SchedulerBuilder {
    store: Arc<dyn NoteStore>,
    deliverer: Arc<dyn Deliverer>,
    config: ScheduleConfig,
    criteria: Option<SelectionCriteria>,
}

impl SchedulerBuilder {
    pub fn new(store: Arc<dyn NoteStore>, deliverer: Arc<dyn Deliverer>) -> Self {
        Self {
            store,
            deliverer,
            config: ScheduleConfig::default(),
            criteria: None,
        }
    }

    pub fn with_config(mut self, config: ScheduleConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the selection criteria. When absent, defaults are used with
    /// the note cap taken from the schedule config.
    pub fn with_criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn build(self) -> Result<NoteScheduler> {
        self.config.validate()?;
        let criteria = match self.criteria {
            Some(criteria) => criteria,
            None => SelectionCriteria::default().with_max_notes(self.config.max_notes_per_email),
        };
        criteria.validate()?;

        Ok(NoteScheduler {
            config: self.config,
            criteria,
            store: self.store,
            deliverer: self.deliverer,
            selector: SelectionAlgorithm::new(ContentAnalyzer::new()),
        })
    }
}

/// A configured scheduler, ready to start.
pub struct NoteScheduler {
    config: ScheduleConfig,
    criteria: SelectionCriteria,
    store: Arc<dyn NoteStore>,
    deliverer: Arc<dyn Deliverer>,
    selector: SelectionAlgorithm,
}

impl NoteScheduler {
    pub fn builder(store: Arc<dyn NoteStore>, deliverer: Arc<dyn Deliverer>) -> SchedulerBuilder {
        SchedulerBuilder::new(store, deliverer)
    }

    /// Spawn the trigger loop and job runner, returning a control handle.
    pub fn start(self) -> SchedulerHandle {
        let (status_tx, status_rx) = watch::channel(SchedulerStatus {
            running: true,
            ..SchedulerStatus::default()
        });
        let shared = Arc::new(Shared {
            busy: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            status_tx,
        });
        let (msg_tx, msg_rx) = mpsc::channel(defaults::TRIGGER_CHANNEL_CAPACITY);
        let (ticker_stop_tx, ticker_stop_rx) = mpsc::channel(1);

        info!(
            schedule = ?self.config.schedule,
            check_interval_secs = self.config.check_interval_seconds,
            "Starting scheduler"
        );

        let shutdown_timeout = self.config.shutdown_timeout();
        let history_limit = self.config.history_limit;
        let ticker = Ticker {
            schedule: self.config.schedule,
            time_of_day: self.config.time_of_day,
            check_interval: self.config.check_interval(),
            shared: shared.clone(),
            msg_tx: msg_tx.clone(),
        };
        let runner = JobRunner {
            config: self.config,
            criteria: self.criteria,
            store: self.store,
            deliverer: self.deliverer,
            selector: self.selector,
            shared: shared.clone(),
            history: VecDeque::new(),
        };

        let runner_task = tokio::spawn(runner.run(msg_rx));
        let ticker_task = tokio::spawn(ticker.run(ticker_stop_rx));

        SchedulerHandle {
            shared,
            msg_tx,
            ticker_stop_tx,
            status_rx,
            runner_task: Mutex::new(Some(runner_task)),
            ticker_task: Mutex::new(Some(ticker_task)),
            shutdown_timeout,
            history_limit,
        }
    }
}

/// Control handle for a running scheduler.
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    msg_tx: mpsc::Sender<RunnerMessage>,
    ticker_stop_tx: mpsc::Sender<()>,
    status_rx: watch::Receiver<SchedulerStatus>,
    runner_task: Mutex<Option<JoinHandle<()>>>,
    ticker_task: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
    history_limit: usize,
}

impl SchedulerHandle {
    /// Trigger a job outside the schedule.
    ///
    /// Returns [`Error::Busy`] when a job is already in flight and
    /// [`Error::ShuttingDown`] after a stop has been requested.
    pub fn run_job_now(&self) -> Result<Uuid> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShuttingDown);
        }
        self.shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;

        let id = Uuid::new_v4();
        let msg = RunnerMessage::Run {
            id,
            trigger: JobTrigger::Manual,
        };
        if self.msg_tx.try_send(msg).is_err() {
            self.shared.busy.store(false, Ordering::Release);
            return Err(Error::Job("job runner unavailable".into()));
        }
        info!(job_id = %id, "Manual job trigger accepted");
        Ok(id)
    }

    /// Latest status snapshot.
    pub fn status(&self) -> SchedulerStatus {
        self.status_rx.borrow().clone()
    }

    /// Request shutdown and wait for the in-flight job, if any.
    ///
    /// Waits up to the configured shutdown timeout for the current job to
    /// reach a terminal state. On timeout the job is retired into history
    /// as cancelled and the runner task is abandoned: the in-flight
    /// delivery is never interrupted, it runs to completion in the
    /// background and its eventual result is discarded.
    pub async fn stop(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Stopping scheduler");
        self.shared
            .status_tx
            .send_modify(|status| status.shutdown_requested = true);

        let _ = self.ticker_stop_tx.send(()).await;
        let _ = self.msg_tx.try_send(RunnerMessage::Shutdown);

        let shared = self.shared.clone();
        let mut rx = self.status_rx.clone();
        let drained = tokio::time::timeout(self.shutdown_timeout, async move {
            let _ = rx
                .wait_for(|status| {
                    status.current_job.is_none() && !shared.busy.load(Ordering::Acquire)
                })
                .await;
        })
        .await;

        if drained.is_err() {
            warn!(
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Shutdown timeout exceeded, abandoning in-flight job"
            );
            // From here the runner's own publishes are discarded; the job
            // it is still working on is already accounted for below.
            self.shared.detached.store(true, Ordering::Release);
            let history_limit = self.history_limit;
            self.shared.status_tx.send_modify(|status| {
                if let Some(mut job) = status.current_job.take() {
                    if !job.status.is_terminal() {
                        job.status = JobStatus::Cancelled;
                        job.finished_at = Some(Utc::now());
                    }
                    status.history.insert(0, job);
                    status.history.truncate(history_limit);
                    status.statistics = JobStatistics::from_history(status.history.iter());
                }
                status.running = false;
            });
            // Dropping the handle detaches the task; the in-flight
            // delivery runs to completion in the background.
            drop(self.runner_task.lock().await.take());
        } else {
            self.shared
                .status_tx
                .send_modify(|status| status.running = false);
        }
        info!("Scheduler stopped");
    }

    /// Wait for both background tasks to exit. Call after [`stop`](Self::stop).
    pub async fn wait_for_shutdown(&self) {
        if let Some(task) = self.ticker_task.lock().await.take() {
            let _ = task.await;
        }
        if let Some(task) = self.runner_task.lock().await.take() {
            let _ = task.await;
        }
    }
}

/// Polls the wall clock and fires runs for matching schedule windows.
struct Ticker {
    schedule: ScheduleType,
    time_of_day: NaiveTime,
    check_interval: Duration,
    shared: Arc<Shared>,
    msg_tx: mpsc::Sender<RunnerMessage>,
}

impl Ticker {
    async fn run(self, mut stop_rx: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watermark = TriggerWatermark::new(Local::now());
        info!("Trigger loop started");

        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                _ = interval.tick() => {
                    if self.shared.shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    if watermark.should_fire(self.schedule, self.time_of_day, Local::now()) {
                        self.fire().await;
                    }
                }
            }
        }
        info!("Trigger loop stopped");
    }

    async fn fire(&self) {
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Skipping scheduled trigger, a job is already running");
            return;
        }
        let id = Uuid::new_v4();
        let msg = RunnerMessage::Run {
            id,
            trigger: JobTrigger::Scheduled,
        };
        if self.msg_tx.try_send(msg).is_err() {
            self.shared.busy.store(false, Ordering::Release);
            warn!("Job runner unavailable for scheduled trigger");
            return;
        }
        info!(job_id = %id, "Scheduled trigger fired");
    }
}

/// Last-fired bookkeeping preventing duplicate fires in one window.
struct TriggerWatermark {
    last_fired_date: Option<NaiveDate>,
    last_fired_at: Option<DateTime<Local>>,
}

impl TriggerWatermark {
    /// The interval schedule measures from startup, not from the epoch.
    fn new(now: DateTime<Local>) -> Self {
        Self {
            last_fired_date: None,
            last_fired_at: Some(now),
        }
    }

    /// Check whether the schedule is due and advance the watermark if so.
    fn should_fire(
        &mut self,
        schedule: ScheduleType,
        time_of_day: NaiveTime,
        now: DateTime<Local>,
    ) -> bool {
        match schedule {
            ScheduleType::Daily => self.fire_at_time(time_of_day, now),
            ScheduleType::Weekly(day) => {
                if now.weekday() != day {
                    return false;
                }
                self.fire_at_time(time_of_day, now)
            }
            ScheduleType::EveryHours(hours) => {
                let due = match self.last_fired_at {
                    None => true,
                    Some(prev) => now - prev >= chrono::Duration::hours(i64::from(hours)),
                };
                if due {
                    self.last_fired_at = Some(now);
                }
                due
            }
        }
    }

    /// At most once per calendar day, once the trigger time has passed.
    fn fire_at_time(&mut self, time_of_day: NaiveTime, now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        if self.last_fired_date == Some(today) {
            return false;
        }
        if now.time() < time_of_day {
            return false;
        }
        self.last_fired_date = Some(today);
        true
    }
}

/// Owns all mutable job state and executes one job at a time.
struct JobRunner {
    config: ScheduleConfig,
    criteria: SelectionCriteria,
    store: Arc<dyn NoteStore>,
    deliverer: Arc<dyn Deliverer>,
    selector: SelectionAlgorithm,
    shared: Arc<Shared>,
    history: VecDeque<JobExecution>,
}

impl JobRunner {
    async fn run(mut self, mut msg_rx: mpsc::Receiver<RunnerMessage>) {
        info!("Job runner started");
        while let Some(msg) = msg_rx.recv().await {
            match msg {
                RunnerMessage::Run { id, trigger } => {
                    let job = self.execute_job(id, trigger).await;
                    // Release the latch before the final publish so stop()
                    // observes both on the same snapshot change.
                    self.shared.busy.store(false, Ordering::Release);
                    self.record(job);
                }
                RunnerMessage::Shutdown => break,
            }
        }
        info!("Job runner stopped");
    }

    /// Run a job to a terminal state, retrying failed attempts with a
    /// fixed delay. Cancellation is checked between attempts only.
    async fn execute_job(&mut self, id: Uuid, trigger: JobTrigger) -> JobExecution {
        let mut job = JobExecution::new(id, trigger);
        info!(job_id = %id, trigger = ?trigger, "Starting review job");
        self.publish(Some(&job));

        let mut attempt: u32 = 0;
        loop {
            if self.shared.shutdown.load(Ordering::Acquire) {
                job.status = JobStatus::Cancelled;
                job.finished_at = Some(Utc::now());
                warn!(job_id = %id, "Job cancelled by shutdown");
                break;
            }

            job.status = JobStatus::Running;
            job.retry_count = attempt;
            if job.started_at.is_none() {
                job.started_at = Some(Utc::now());
            }
            self.publish(Some(&job));

            match self.run_attempt(&mut job).await {
                Ok(()) => {
                    job.status = JobStatus::Completed;
                    job.finished_at = Some(Utc::now());
                    info!(
                        job_id = %id,
                        attempts = attempt + 1,
                        notes_processed = job.notes_processed,
                        emails_sent = job.emails_sent,
                        duration_ms = job.duration_ms().unwrap_or(0),
                        "Review job completed"
                    );
                    break;
                }
                Err(err) => {
                    warn!(job_id = %id, attempt = attempt + 1, error = %err, "Job attempt failed");
                    job.error_message = Some(err.to_string());
                    if attempt >= self.config.max_retries {
                        job.status = JobStatus::Failed;
                        job.finished_at = Some(Utc::now());
                        error!(
                            job_id = %id,
                            attempts = attempt + 1,
                            error = %err,
                            "Review job failed, retries exhausted"
                        );
                        break;
                    }
                    self.publish(Some(&job));
                    debug!(
                        job_id = %id,
                        delay_secs = self.config.retry_delay_seconds,
                        "Retrying after delay"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
            }
        }

        self.publish(Some(&job));
        job
    }

    /// One fetch-select-deliver-record pass.
    async fn run_attempt(&mut self, job: &mut JobExecution) -> Result<()> {
        let candidates = self
            .store
            .fetch_candidates(self.config.min_days_between_sends)
            .await?;
        debug!(candidate_count = candidates.len(), "Fetched candidates");
        if candidates.is_empty() {
            info!("No candidates due for review");
            job.notes_processed = 0;
            job.emails_sent = 0;
            return Ok(());
        }
        job.notes_processed = candidates.len();

        let selected = self.selector.select(&candidates, &self.criteria);
        if selected.is_empty() {
            info!("Selection produced no viable notes");
            job.emails_sent = 0;
            return Ok(());
        }

        let receipt = self.deliverer.deliver(&selected).await?;
        let sent_at = Utc::now();
        for score in &selected {
            self.store
                .record_send(SendRecord {
                    note_id: score.note_id,
                    sent_at,
                    subject: receipt.subject.clone(),
                    batch_size: selected.len(),
                })
                .await?;
        }
        job.emails_sent = 1;
        info!(
            selected_count = selected.len(),
            subject = %receipt.subject,
            "Review email delivered"
        );
        Ok(())
    }

    /// Retire a finished job into bounded history and publish the
    /// idle snapshot.
    fn record(&mut self, job: JobExecution) {
        self.history.push_front(job);
        self.history.truncate(self.config.history_limit);
        self.publish(None);
    }

    fn publish(&self, current: Option<&JobExecution>) {
        if self.shared.detached.load(Ordering::Acquire) {
            return;
        }
        let shutdown = self.shared.shutdown.load(Ordering::Acquire);
        self.shared.status_tx.send_replace(SchedulerStatus {
            running: !shutdown,
            shutdown_requested: shutdown,
            current_job: current.cloned(),
            history: self.history.iter().cloned().collect(),
            statistics: JobStatistics::from_history(self.history.iter()),
        });
    }
}
