//! Centralized default constants for the revu system.
//!
//! **This module is the single source of truth** for all shared default
//! values. The selection and scheduler crates reference these constants
//! instead of defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// SELECTION
// =============================================================================

/// Default maximum notes per review email.
pub const MAX_NOTES: usize = 5;

/// Default minimum notes per review email.
///
/// The length-budget walk may run past `MAX_EMAIL_LENGTH_CHARS` until this
/// many notes have been accepted.
pub const MIN_NOTES: usize = 1;

/// Default email length budget in estimated characters.
pub const MAX_EMAIL_LENGTH_CHARS: usize = 10_000;

/// Average characters per word used to estimate rendered email length.
pub const ESTIMATED_CHARS_PER_WORD: usize = 6;

/// Default minimum word count for a note to be a viable candidate.
pub const MIN_WORD_COUNT: usize = 10;

/// Default maximum age (days since modification) for a viable candidate.
pub const MAX_DAYS_SINCE_MODIFICATION: i64 = 365;

// =============================================================================
// SCORING WEIGHTS
// =============================================================================
// The five component weights should sum to 1.0. Drift is warned about at
// criteria validation, never rejected.

/// Weight of the content quality component.
pub const CONTENT_WEIGHT: f64 = 0.3;

/// Weight of the freshness (recency) component.
pub const FRESHNESS_WEIGHT: f64 = 0.25;

/// Weight of the importance component.
pub const IMPORTANCE_WEIGHT: f64 = 0.2;

/// Weight of the send-history component.
pub const SEND_HISTORY_WEIGHT: f64 = 0.15;

/// Weight of the diversity component.
pub const DIVERSITY_WEIGHT: f64 = 0.1;

// =============================================================================
// IMPORTANCE MULTIPLIERS (criteria defaults)
// =============================================================================
// Applied to the importance component. Independent from the fixed tier
// multipliers inside the content score.

/// Importance score multiplier for Critical-tier notes.
pub const CRITICAL_BOOST_MULTIPLIER: f64 = 2.0;

/// Importance score multiplier for High-tier notes.
pub const HIGH_BOOST_MULTIPLIER: f64 = 1.5;

/// Importance score multiplier for Medium-tier notes.
pub const MEDIUM_BOOST_MULTIPLIER: f64 = 1.0;

/// Importance score multiplier for Low-tier notes.
pub const LOW_PENALTY_MULTIPLIER: f64 = 0.7;

// =============================================================================
// CONTENT ANALYSIS
// =============================================================================

/// Freshness sentinel for unreadable notes: old enough to rank last.
pub const DEGRADED_FRESHNESS_DAYS: i64 = 999;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Default minimum days between sends of the same note.
pub const MIN_DAYS_BETWEEN_SENDS: i64 = 7;

/// Default trigger-loop polling interval in seconds.
pub const CHECK_INTERVAL_SECS: u64 = 60;

/// Default maximum retry count for failed job attempts
/// (total attempts = retries + 1).
pub const JOB_MAX_RETRIES: u32 = 3;

/// Default fixed delay between job retry attempts in seconds.
pub const JOB_RETRY_DELAY_SECS: u64 = 300;

/// Default graceful shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default bound on retained job history entries.
pub const JOB_HISTORY_LIMIT: usize = 50;

/// Default capacity of the job trigger channel.
///
/// Single-flight execution means at most one trigger is ever in flight plus
/// a queued shutdown message.
pub const TRIGGER_CHANNEL_CAPACITY: usize = 2;
