//! Selection criteria and per-note score records.

use serde::{Deserialize, Serialize};
use tracing::warn;

use revu_core::{defaults, Error, Result};

use crate::analyzer::{ContentMetrics, ImportanceTier};

/// Configuration for one selection pass.
///
/// Caller-supplied and immutable during the pass. The five component weights
/// should sum to roughly 1.0; drift only warns, it never rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Upper bound on returned notes.
    pub max_notes: usize,
    /// The length-budget walk keeps accepting notes past the budget until
    /// this many have been taken.
    pub min_notes: usize,
    /// Email length budget in estimated characters.
    pub max_email_length_chars: usize,

    // Scoring weights
    pub content_weight: f64,
    pub freshness_weight: f64,
    pub importance_weight: f64,
    pub send_history_weight: f64,
    pub diversity_weight: f64,

    // Selection preferences
    /// Penalize notes whose content duplicates another analyzed note.
    pub avoid_duplicates: bool,
    pub min_word_count: usize,
    pub max_days_since_modification: i64,

    // Importance tier multipliers for the importance component
    pub critical_boost_multiplier: f64,
    pub high_boost_multiplier: f64,
    pub medium_boost_multiplier: f64,
    pub low_penalty_multiplier: f64,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            max_notes: defaults::MAX_NOTES,
            min_notes: defaults::MIN_NOTES,
            max_email_length_chars: defaults::MAX_EMAIL_LENGTH_CHARS,
            content_weight: defaults::CONTENT_WEIGHT,
            freshness_weight: defaults::FRESHNESS_WEIGHT,
            importance_weight: defaults::IMPORTANCE_WEIGHT,
            send_history_weight: defaults::SEND_HISTORY_WEIGHT,
            diversity_weight: defaults::DIVERSITY_WEIGHT,
            avoid_duplicates: true,
            min_word_count: defaults::MIN_WORD_COUNT,
            max_days_since_modification: defaults::MAX_DAYS_SINCE_MODIFICATION,
            critical_boost_multiplier: defaults::CRITICAL_BOOST_MULTIPLIER,
            high_boost_multiplier: defaults::HIGH_BOOST_MULTIPLIER,
            medium_boost_multiplier: defaults::MEDIUM_BOOST_MULTIPLIER,
            low_penalty_multiplier: defaults::LOW_PENALTY_MULTIPLIER,
        }
    }
}

impl SelectionCriteria {
    /// Set the maximum number of notes to select.
    pub fn with_max_notes(mut self, max: usize) -> Self {
        self.max_notes = max;
        self
    }

    /// Set the minimum number of notes the budget walk must accept.
    pub fn with_min_notes(mut self, min: usize) -> Self {
        self.min_notes = min;
        self
    }

    /// Set the email length budget in estimated characters.
    pub fn with_max_email_length(mut self, chars: usize) -> Self {
        self.max_email_length_chars = chars;
        self
    }

    /// Set the minimum word count for viable candidates.
    pub fn with_min_word_count(mut self, words: usize) -> Self {
        self.min_word_count = words;
        self
    }

    /// Set the maximum candidate age in days since modification.
    pub fn with_max_days_since_modification(mut self, days: i64) -> Self {
        self.max_days_since_modification = days;
        self
    }

    /// Enable or disable the duplicate-content penalty.
    pub fn with_avoid_duplicates(mut self, avoid: bool) -> Self {
        self.avoid_duplicates = avoid;
        self
    }

    /// Validate structural constraints.
    ///
    /// Count and budget violations are hard errors. A weight sum away from
    /// 1.0 only warns, matching the documented tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.max_notes == 0 || self.min_notes == 0 {
            return Err(Error::InvalidInput("note counts must be positive".into()));
        }
        if self.max_notes < self.min_notes {
            return Err(Error::InvalidInput(
                "max_notes must be >= min_notes".into(),
            ));
        }
        if self.max_email_length_chars == 0 {
            return Err(Error::InvalidInput(
                "max email length must be positive".into(),
            ));
        }

        let total = self.weight_sum();
        if !(0.8..=1.2).contains(&total) {
            warn!(
                weight_sum = total,
                "Selection weights should sum to roughly 1.0"
            );
        }

        Ok(())
    }

    /// Sum of the five component weights.
    pub fn weight_sum(&self) -> f64 {
        self.content_weight
            + self.freshness_weight
            + self.importance_weight
            + self.send_history_weight
            + self.diversity_weight
    }

    /// Importance-component multiplier for a tier.
    pub fn tier_multiplier(&self, tier: ImportanceTier) -> f64 {
        match tier {
            ImportanceTier::Critical => self.critical_boost_multiplier,
            ImportanceTier::High => self.high_boost_multiplier,
            ImportanceTier::Medium => self.medium_boost_multiplier,
            ImportanceTier::Low => self.low_penalty_multiplier,
        }
    }
}

/// Scoring breakdown for one candidate in one selection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteScore {
    pub note_id: i64,
    pub file_path: String,
    /// Weighted sum of the five components.
    pub total_score: f64,
    pub content_score: f64,
    pub freshness_score: f64,
    pub importance_score: f64,
    pub send_history_score: f64,
    pub diversity_score: f64,
    /// Metrics the components were computed from.
    pub metrics: ContentMetrics,
}

impl NoteScore {
    /// Estimated rendered length in characters.
    pub fn estimated_chars(&self) -> usize {
        self.metrics.word_count * defaults::ESTIMATED_CHARS_PER_WORD
    }
}
