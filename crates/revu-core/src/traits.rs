//! Core traits for revu abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Note, SendRecord};

/// Store of scanned notes and their send history.
///
/// Persistence is owned entirely by the implementation; the scheduling core
/// only queries candidates and records successful sends. A send record is
/// written only after delivery succeeds, so a crash between delivery and
/// `record_send` can re-send a note on the next cycle (at-least-once).
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch candidate notes that have not been sent within the given
    /// number of days (including notes never sent).
    async fn fetch_candidates(&self, not_sent_within_days: i64) -> Result<Vec<Note>>;

    /// Record that a note was included in a delivered email.
    async fn record_send(&self, record: SendRecord) -> Result<()>;
}
