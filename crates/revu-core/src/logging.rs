//! Structured logging schema and field name constants for revu.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (per-note scoring, filter decisions) |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "select", "scheduler", "analyzer"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "select", "analyze", "run_job", "trigger"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Note file path being operated on.
pub const NOTE_PATH: &str = "note_path";

/// Job UUID being executed.
pub const JOB_ID: &str = "job_id";

/// Attempt number within a job's retry loop (1-based).
pub const ATTEMPT: &str = "attempt";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidate notes entering a stage.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of notes surviving or selected by a stage.
pub const SELECTED_COUNT: &str = "selected_count";

/// Estimated rendered length of the selection in characters.
pub const ESTIMATED_CHARS: &str = "estimated_chars";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize a global tracing subscriber for binaries and examples.
///
/// Respects `RUST_LOG`; defaults to `revu=debug` when unset. Returns an
/// error string if a global subscriber is already installed (tests install
/// their own).
pub fn init() -> std::result::Result<(), String> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "revu=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_are_snake_case() {
        for name in [
            SUBSYSTEM,
            OPERATION,
            NOTE_ID,
            NOTE_PATH,
            JOB_ID,
            ATTEMPT,
            DURATION_MS,
            CANDIDATE_COUNT,
            SELECTED_COUNT,
            ESTIMATED_CHARS,
            ERROR_MSG,
        ] {
            assert!(!name.is_empty());
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
