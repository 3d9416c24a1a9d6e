//! Delivery seam between the job runner and the outbound channel.

use async_trait::async_trait;
use tracing::info;

use revu_core::Result;
use revu_select::NoteScore;

/// Receipt returned by a successful delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Subject line the batch was delivered under, recorded per note in
    /// send history.
    pub subject: String,
}

/// Delivers one selected batch as a single outbound message.
///
/// Implementations own rendering and transport. The runner treats any
/// error as a failed attempt and retries the whole job.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, notes: &[NoteScore]) -> Result<DeliveryReceipt>;
}

/// Logs the batch instead of sending it. Useful for dry runs.
#[derive(Debug, Default)]
pub struct NoOpDeliverer;

#[async_trait]
impl Deliverer for NoOpDeliverer {
    async fn deliver(&self, notes: &[NoteScore]) -> Result<DeliveryReceipt> {
        let subject = format!("Note review: {} note(s)", notes.len());
        for score in notes {
            info!(
                note_id = score.note_id,
                path = %score.file_path,
                score = score.total_score,
                "Would deliver note"
            );
        }
        Ok(DeliveryReceipt { subject })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revu_select::{ContentMetrics, ImportanceTier};

    fn score(note_id: i64) -> NoteScore {
        NoteScore {
            note_id,
            file_path: format!("/notes/{note_id}.md"),
            total_score: 50.0,
            content_score: 50.0,
            freshness_score: 50.0,
            importance_score: 50.0,
            send_history_score: 50.0,
            diversity_score: 80.0,
            metrics: ContentMetrics {
                content_hash: String::new(),
                word_count: 20,
                line_count: 1,
                code_blocks: 0,
                headers: 0,
                links: 0,
                todo_items: 0,
                importance_keywords: 0,
                readability_score: 60.0,
                freshness_days: 1,
                importance: ImportanceTier::Medium,
            },
        }
    }

    #[tokio::test]
    async fn noop_reports_batch_size_in_subject() {
        let deliverer = NoOpDeliverer;
        let receipt = deliverer.deliver(&[score(1), score(2)]).await.unwrap();
        assert_eq!(receipt.subject, "Note review: 2 note(s)");
    }
}
