//! Data models shared across the revu crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note file tracked by the note store.
///
/// Immutable once read by the selection/scheduling core; the core never
/// mutates notes, it only scores them and records sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier.
    pub id: i64,
    /// Absolute path to the note file on disk.
    pub file_path: String,
    /// Content hash recorded by the store at scan time.
    pub content_hash: String,
    /// File size in bytes at scan time.
    pub file_size: i64,
    /// When the note was first seen.
    pub created_at: DateTime<Utc>,
    /// Last modification time of the underlying file.
    pub modified_at: DateTime<Utc>,
}

impl Note {
    /// Days elapsed since the note was last modified, clamped at zero.
    pub fn days_since_modification(&self, now: DateTime<Utc>) -> i64 {
        (now - self.modified_at).num_days().max(0)
    }
}

/// Record of a note having been included in a delivered review email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRecord {
    /// The note that was sent.
    pub note_id: i64,
    /// When delivery succeeded.
    pub sent_at: DateTime<Utc>,
    /// Subject line of the email the note was part of.
    pub subject: String,
    /// How many notes the email contained.
    pub batch_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_note(modified_at: DateTime<Utc>) -> Note {
        Note {
            id: 1,
            file_path: "/notes/alpha.md".to_string(),
            content_hash: "abc123".to_string(),
            file_size: 1024,
            created_at: modified_at,
            modified_at,
        }
    }

    #[test]
    fn days_since_modification_basic() {
        let now = Utc::now();
        let note = sample_note(now - Duration::days(12));
        assert_eq!(note.days_since_modification(now), 12);
    }

    #[test]
    fn days_since_modification_clamps_future_timestamps() {
        let now = Utc::now();
        let note = sample_note(now + Duration::days(3));
        assert_eq!(note.days_since_modification(now), 0);
    }

    #[test]
    fn note_serde_round_trip() {
        let now = Utc::now();
        let note = sample_note(now);
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn send_record_serde_round_trip() {
        let record = SendRecord {
            note_id: 7,
            sent_at: Utc::now(),
            subject: "Your note review".to_string(),
            batch_size: 3,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: SendRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
