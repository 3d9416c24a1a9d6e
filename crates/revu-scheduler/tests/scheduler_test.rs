//! End-to-end scheduler tests over mock stores and deliverers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tempfile::TempDir;
use tokio::sync::Notify;

use revu_core::{Error, Note, NoteStore, Result, SendRecord};
use revu_scheduler::{
    Deliverer, DeliveryReceipt, JobStatus, NoteScheduler, ScheduleConfig, ScheduleType,
    SchedulerHandle, SchedulerStatus,
};
use revu_select::NoteScore;

struct MockStore {
    notes: Vec<Note>,
    fail_fetch: bool,
    fetch_calls: AtomicUsize,
    sends: Mutex<Vec<SendRecord>>,
}

impl MockStore {
    fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes,
            fail_fetch: false,
            fetch_calls: AtomicUsize::new(0),
            sends: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::with_notes(Vec::new())
        }
    }
}

#[async_trait]
impl NoteStore for MockStore {
    async fn fetch_candidates(&self, _not_sent_within_days: i64) -> Result<Vec<Note>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(Error::Store("connection refused".into()));
        }
        Ok(self.notes.clone())
    }

    async fn record_send(&self, record: SendRecord) -> Result<()> {
        self.sends.lock().unwrap().push(record);
        Ok(())
    }
}

struct CountingDeliverer {
    calls: AtomicUsize,
}

impl CountingDeliverer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Deliverer for CountingDeliverer {
    async fn deliver(&self, notes: &[NoteScore]) -> Result<DeliveryReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryReceipt {
            subject: format!("Review digest ({} notes)", notes.len()),
        })
    }
}

/// Blocks inside deliver() until released, to hold a job in flight.
struct GatedDeliverer {
    started: Arc<Notify>,
    release: Arc<Notify>,
    completed: AtomicUsize,
}

#[async_trait]
impl Deliverer for GatedDeliverer {
    async fn deliver(&self, _notes: &[NoteScore]) -> Result<DeliveryReceipt> {
        self.started.notify_one();
        self.release.notified().await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryReceipt {
            subject: "Gated digest".into(),
        })
    }
}

fn write_note(dir: &TempDir, id: i64, content: &str) -> Note {
    let path = dir.path().join(format!("note-{id}.md"));
    std::fs::write(&path, content).unwrap();
    let now = Utc::now();
    Note {
        id,
        file_path: path.to_string_lossy().into_owned(),
        content_hash: String::new(),
        file_size: content.len() as i64,
        created_at: now - ChronoDuration::days(30),
        modified_at: now - ChronoDuration::days(1),
    }
}

fn quick_config() -> ScheduleConfig {
    // An interval schedule far in the future keeps the trigger loop from
    // firing on its own while manual runs are under test.
    ScheduleConfig::default()
        .with_schedule(ScheduleType::EveryHours(1_000))
        .with_check_interval(3600)
        .with_retry_delay(1)
        .with_shutdown_timeout(5)
}

async fn wait_until<F>(handle: &SchedulerHandle, pred: F) -> SchedulerStatus
where
    F: Fn(&SchedulerStatus) -> bool,
{
    loop {
        let status = handle.status();
        if pred(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn manual_job_delivers_and_records_sends() {
    let dir = TempDir::new().unwrap();
    let notes = vec![
        write_note(
            &dir,
            1,
            "Garden layout sketches with measurements for the raised beds \
             and a watering rotation covering the warm months ahead.",
        ),
        write_note(
            &dir,
            2,
            "Reading list for the autumn: three novels, one biography, and \
             a long-deferred collection of essays about mountains.",
        ),
    ];
    let store = Arc::new(MockStore::with_notes(notes));
    let deliverer = Arc::new(CountingDeliverer::new());

    let handle = NoteScheduler::builder(store.clone(), deliverer.clone())
        .with_config(quick_config())
        .build()
        .unwrap()
        .start();

    let job_id = handle.run_job_now().unwrap();
    let status = wait_until(&handle, |s| !s.history.is_empty()).await;

    let job = &status.history[0];
    assert_eq!(job.id, job_id);
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.notes_processed, 2);
    assert_eq!(job.emails_sent, 1);
    assert_eq!(deliverer.calls.load(Ordering::SeqCst), 1);

    let sends = store.sends.lock().unwrap();
    assert_eq!(sends.len(), 2);
    assert!(sends.iter().all(|r| r.batch_size == 2));
    assert!(sends.iter().all(|r| r.subject == "Review digest (2 notes)"));

    drop(sends);
    handle.stop().await;
    handle.wait_for_shutdown().await;
}

#[tokio::test]
async fn empty_store_completes_without_delivery() {
    let store = Arc::new(MockStore::with_notes(Vec::new()));
    let deliverer = Arc::new(CountingDeliverer::new());

    let handle = NoteScheduler::builder(store.clone(), deliverer.clone())
        .with_config(quick_config())
        .build()
        .unwrap()
        .start();

    handle.run_job_now().unwrap();
    let status = wait_until(&handle, |s| !s.history.is_empty()).await;

    let job = &status.history[0];
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.notes_processed, 0);
    assert_eq!(job.emails_sent, 0);
    assert_eq!(deliverer.calls.load(Ordering::SeqCst), 0);
    assert!(store.sends.lock().unwrap().is_empty());

    handle.stop().await;
    handle.wait_for_shutdown().await;
}

#[tokio::test]
async fn concurrent_manual_trigger_is_rejected() {
    let dir = TempDir::new().unwrap();
    let notes = vec![write_note(
        &dir,
        7,
        "Meeting follow ups from the vendor call, including two open \
         clarifications about invoicing cadence and contract renewal.",
    )];
    let store = Arc::new(MockStore::with_notes(notes));
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let deliverer = Arc::new(GatedDeliverer {
        started: started.clone(),
        release: release.clone(),
        completed: AtomicUsize::new(0),
    });

    let handle = NoteScheduler::builder(store, deliverer)
        .with_config(quick_config())
        .build()
        .unwrap()
        .start();

    handle.run_job_now().unwrap();
    started.notified().await;

    // The first job is parked inside delivery; a second trigger must bounce.
    let err = handle.run_job_now().unwrap_err();
    assert!(matches!(err, Error::Busy));

    release.notify_one();
    let status = wait_until(&handle, |s| !s.history.is_empty()).await;
    assert_eq!(status.history[0].status, JobStatus::Completed);

    // With the latch released a new trigger is accepted again.
    release.notify_one();
    handle.run_job_now().unwrap();
    let status = wait_until(&handle, |s| s.history.len() == 2).await;
    assert_eq!(status.statistics.total_jobs, 2);

    handle.stop().await;
    handle.wait_for_shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_retries_then_marks_job_failed() {
    let store = Arc::new(MockStore::failing());
    let deliverer = Arc::new(CountingDeliverer::new());

    let handle = NoteScheduler::builder(store.clone(), deliverer.clone())
        .with_config(quick_config().with_max_retries(2).with_retry_delay(60))
        .build()
        .unwrap()
        .start();

    handle.run_job_now().unwrap();
    let status = wait_until(&handle, |s| !s.history.is_empty()).await;

    let job = &status.history[0];
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 2);
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("connection refused"));
    // First attempt plus two retries.
    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 3);
    assert_eq!(deliverer.calls.load(Ordering::SeqCst), 0);

    assert_eq!(status.statistics.failed_jobs, 1);
    assert!(status.statistics.success_rate < f64::EPSILON);

    handle.stop().await;
    handle.wait_for_shutdown().await;
}

#[tokio::test]
async fn shutdown_timeout_cancels_overrun_job_without_interrupting_delivery() {
    let dir = TempDir::new().unwrap();
    let notes = vec![write_note(
        &dir,
        11,
        "Notes from the long weekend hike, with trail conditions and the \
         water sources we found above the saddle.",
    )];
    let store = Arc::new(MockStore::with_notes(notes));
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let deliverer = Arc::new(GatedDeliverer {
        started: started.clone(),
        release: release.clone(),
        completed: AtomicUsize::new(0),
    });

    let handle = NoteScheduler::builder(store.clone(), deliverer.clone())
        .with_config(quick_config().with_shutdown_timeout(1))
        .build()
        .unwrap()
        .start();

    handle.run_job_now().unwrap();
    started.notified().await;

    // Delivery is parked past the shutdown timeout; stop() must give up
    // on it without tearing it down.
    handle.stop().await;

    let status = handle.status();
    assert!(!status.running);
    assert!(status.current_job.is_none());
    assert_eq!(status.history.len(), 1);
    assert_eq!(status.history[0].status, JobStatus::Cancelled);
    assert!(status.history[0].finished_at.is_some());
    assert_eq!(status.statistics.cancelled_jobs, 1);
    assert_eq!(deliverer.completed.load(Ordering::SeqCst), 0);

    // The abandoned delivery was not interrupted: once released it runs
    // to completion and still records its sends.
    release.notify_one();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while deliverer.completed.load(Ordering::SeqCst) == 0
        || store.sends.lock().unwrap().is_empty()
    {
        assert!(
            tokio::time::Instant::now() < deadline,
            "abandoned delivery never completed"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Its eventual result is discarded: the job stays cancelled.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = handle.status();
    assert_eq!(status.history[0].status, JobStatus::Cancelled);
    assert_eq!(status.statistics.cancelled_jobs, 1);

    handle.wait_for_shutdown().await;
}

#[tokio::test]
async fn stop_rejects_new_triggers() {
    let store = Arc::new(MockStore::with_notes(Vec::new()));
    let deliverer = Arc::new(CountingDeliverer::new());

    let handle = NoteScheduler::builder(store, deliverer)
        .with_config(quick_config())
        .build()
        .unwrap()
        .start();

    handle.stop().await;

    let err = handle.run_job_now().unwrap_err();
    assert!(matches!(err, Error::ShuttingDown));

    let status = handle.status();
    assert!(!status.running);
    assert!(status.shutdown_requested);

    handle.wait_for_shutdown().await;
}

#[tokio::test]
async fn history_is_bounded_and_newest_first() {
    let store = Arc::new(MockStore::with_notes(Vec::new()));
    let deliverer = Arc::new(CountingDeliverer::new());

    let handle = NoteScheduler::builder(store, deliverer)
        .with_config(quick_config().with_history_limit(2))
        .build()
        .unwrap()
        .start();

    let mut ids = Vec::new();
    for expected_len in 1..=3usize {
        let id = handle.run_job_now().unwrap();
        ids.push(id);
        wait_until(&handle, |s| {
            s.history.len() == expected_len.min(2) && s.history.first().map(|j| j.id) == Some(id)
        })
        .await;
    }

    let status = handle.status();
    assert_eq!(status.history.len(), 2);
    // Newest first; the oldest execution has been evicted.
    assert_eq!(status.history[0].id, ids[2]);
    assert_eq!(status.history[1].id, ids[1]);
    assert_eq!(status.statistics.total_jobs, 2);

    handle.stop().await;
    handle.wait_for_shutdown().await;
}
