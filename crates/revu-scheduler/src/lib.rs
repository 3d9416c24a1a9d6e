//! # revu-scheduler
//!
//! Background job scheduling and execution for revu.
//!
//! The scheduler runs the periodic review pipeline: fetch candidates from a
//! [`NoteStore`](revu_core::NoteStore), select with `revu-select`, hand the
//! batch to a [`Deliverer`], and record the send. One job runs at a time;
//! status is observable through atomically published snapshots.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use revu_scheduler::{NoteScheduler, NoOpDeliverer, ScheduleConfig};
//!
//! let scheduler = NoteScheduler::builder(store, Arc::new(NoOpDeliverer))
//!     .with_config(ScheduleConfig::default())
//!     .build()?;
//! let handle = scheduler.start();
//! handle.run_job_now()?;
//! // ...
//! handle.stop().await;
//! ```

pub mod config;
pub mod deliver;
pub mod job;
pub mod scheduler;

pub use config::{ScheduleConfig, ScheduleType};
pub use deliver::{Deliverer, DeliveryReceipt, NoOpDeliverer};
pub use job::{JobExecution, JobStatistics, JobStatus, JobTrigger, SchedulerStatus};
pub use scheduler::{NoteScheduler, SchedulerBuilder, SchedulerHandle};
