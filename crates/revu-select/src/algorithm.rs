//! Note selection with weighted multi-criteria scoring.
//!
//! Four stages per pass: filter viable candidates, score each survivor,
//! keep the top K in a bounded min-heap, then walk the ranking under the
//! email length budget. The algorithm owns the in-process selection-history
//! cache feeding the send-history component.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use revu_core::Note;

use crate::analyzer::{ContentAnalyzer, ContentMetrics, ImportanceTier};
use crate::criteria::{NoteScore, SelectionCriteria};

/// Diversity component when a note's content duplicates another note.
const DUPLICATE_DIVERSITY_SCORE: f64 = 20.0;

/// Diversity component for unique content.
const UNIQUE_DIVERSITY_SCORE: f64 = 80.0;

/// Send-history component for notes never selected by this instance.
const NEVER_SELECTED_SCORE: f64 = 100.0;

/// Note selection engine.
///
/// Owns the content analyzer (and with it the duplicate index) plus the
/// selection-history cache. Both live for the instance lifetime and are not
/// persisted; a restart forgets recent selections (the store's
/// `not_sent_within_days` query is the durable suppression).
pub struct SelectionAlgorithm {
    analyzer: ContentAnalyzer,
    /// note id -> when this instance last selected it
    selection_history: HashMap<i64, DateTime<Utc>>,
}

impl SelectionAlgorithm {
    pub fn new(analyzer: ContentAnalyzer) -> Self {
        Self {
            analyzer,
            selection_history: HashMap::new(),
        }
    }

    /// Read access to the analyzer's duplicate index.
    pub fn analyzer(&self) -> &ContentAnalyzer {
        &self.analyzer
    }

    /// Select the best notes from `candidates`, ranked by descending total
    /// score, bounded by `criteria.max_notes` and the email length budget.
    ///
    /// Per-note failures (unreadable files, filter misses) skip that note
    /// only. Accepted notes are recorded in the selection-history cache.
    pub fn select(&mut self, candidates: &[Note], criteria: &SelectionCriteria) -> Vec<NoteScore> {
        let now = Utc::now();
        info!(
            candidate_count = candidates.len(),
            op = "select",
            "Starting note selection"
        );

        let filtered = filter_candidates(candidates, criteria, now);
        debug!(
            candidate_count = filtered.len(),
            "Candidates surviving filter"
        );
        if filtered.is_empty() {
            warn!("No viable notes after filtering");
            return Vec::new();
        }

        let scored: Vec<NoteScore> = filtered
            .iter()
            .map(|(note, content)| self.score_note(note, content, criteria, now))
            .collect();

        let ranked = select_top(scored, criteria.max_notes);
        let accepted = apply_length_budget(ranked, criteria);

        for score in &accepted {
            self.selection_history.insert(score.note_id, now);
        }

        let estimated: usize = accepted.iter().map(NoteScore::estimated_chars).sum();
        info!(
            selected_count = accepted.len(),
            estimated_chars = estimated,
            "Note selection complete"
        );

        accepted
    }

    /// Forget all selection history.
    pub fn clear_history(&mut self) {
        self.selection_history.clear();
        debug!("Selection history cleared");
    }

    /// Score one filtered candidate.
    fn score_note(
        &mut self,
        note: &Note,
        content: &str,
        criteria: &SelectionCriteria,
        now: DateTime<Utc>,
    ) -> NoteScore {
        let metrics = self.analyzer.analyze(note, Some(content));

        let content_score = metrics.content_score();
        let freshness_score = metrics.freshness_score();
        let importance_score = importance_score(&metrics, criteria);
        let send_history_score = self.send_history_score(note.id, now);
        let diversity_score = self.diversity_score(note, criteria);

        let total_score = content_score * criteria.content_weight
            + freshness_score * criteria.freshness_weight
            + importance_score * criteria.importance_weight
            + send_history_score * criteria.send_history_weight
            + diversity_score * criteria.diversity_weight;

        trace!(
            note_id = note.id,
            total_score,
            content_score,
            freshness_score,
            importance_score,
            send_history_score,
            diversity_score,
            "Scored candidate"
        );

        NoteScore {
            note_id: note.id,
            file_path: note.file_path.clone(),
            total_score,
            content_score,
            freshness_score,
            importance_score,
            send_history_score,
            diversity_score,
            metrics,
        }
    }

    /// Send-history component from the in-process cache.
    ///
    /// Never-selected notes score highest; recently selected ones lowest.
    fn send_history_score(&self, note_id: i64, now: DateTime<Utc>) -> f64 {
        let Some(last_selected) = self.selection_history.get(&note_id) else {
            return NEVER_SELECTED_SCORE;
        };

        let days = (now - *last_selected).num_days();
        if days >= 90 {
            90.0
        } else if days >= 30 {
            70.0
        } else if days >= 14 {
            50.0
        } else if days >= 7 {
            30.0
        } else {
            10.0
        }
    }

    /// Diversity component: penalize duplicated content when configured.
    fn diversity_score(&self, note: &Note, criteria: &SelectionCriteria) -> f64 {
        if criteria.avoid_duplicates && self.analyzer.is_duplicate(&note.file_path) {
            DUPLICATE_DIVERSITY_SCORE
        } else {
            UNIQUE_DIVERSITY_SCORE
        }
    }
}

/// Importance component: keyword-density bonus over a baseline, boosted by
/// the criteria's tier multiplier, capped at 100.
fn importance_score(metrics: &ContentMetrics, criteria: &SelectionCriteria) -> f64 {
    let keyword_bonus = ((metrics.importance_keywords * 5) as f64).min(25.0);
    let multiplier = criteria.tier_multiplier(metrics.importance);
    ((50.0 + keyword_bonus) * multiplier).min(100.0)
}

/// Drop candidates that are too old, missing, or too short.
///
/// Reads each surviving file once; the content is reused for scoring so the
/// analyzer never re-reads it.
fn filter_candidates<'a>(
    notes: &'a [Note],
    criteria: &SelectionCriteria,
    now: DateTime<Utc>,
) -> Vec<(&'a Note, String)> {
    let mut filtered = Vec::new();

    for note in notes {
        let age = note.days_since_modification(now);
        if age > criteria.max_days_since_modification {
            trace!(note_id = note.id, age, "Skipping stale note");
            continue;
        }

        let content = match std::fs::read_to_string(&note.file_path) {
            Ok(content) => content,
            Err(e) => {
                debug!(
                    note_path = %note.file_path,
                    error = %e,
                    "Skipping unreadable note"
                );
                continue;
            }
        };

        let word_count = content.split_whitespace().count();
        if word_count < criteria.min_word_count {
            trace!(note_id = note.id, word_count, "Skipping short note");
            continue;
        }

        filtered.push((note, content));
    }

    filtered
}

/// Full ranking order: higher total score first, then lower note id.
///
/// The id tie-break makes selection deterministic regardless of candidate
/// iteration order.
fn rank_order(a: &NoteScore, b: &NoteScore) -> Ordering {
    a.total_score
        .total_cmp(&b.total_score)
        .then_with(|| b.note_id.cmp(&a.note_id))
}

/// Heap entry ordered by [`rank_order`].
struct RankEntry(NoteScore);

impl PartialEq for RankEntry {
    fn eq(&self, other: &Self) -> bool {
        rank_order(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for RankEntry {}

impl PartialOrd for RankEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        rank_order(&self.0, &other.0)
    }
}

/// Bounded top-K over a size-`max_notes` min-heap.
///
/// While under capacity every score is pushed; at capacity a new score
/// replaces the heap minimum only when it ranks strictly higher. The result
/// is sorted descending by rank.
fn select_top(scored: Vec<NoteScore>, max_notes: usize) -> Vec<NoteScore> {
    if max_notes == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<RankEntry>> = BinaryHeap::with_capacity(max_notes);

    for score in scored {
        if heap.len() < max_notes {
            heap.push(Reverse(RankEntry(score)));
        } else if let Some(Reverse(min_entry)) = heap.peek() {
            if rank_order(&score, &min_entry.0) == Ordering::Greater {
                heap.pop();
                heap.push(Reverse(RankEntry(score)));
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(entry)| entry.0)
        .collect()
}

/// Walk the ranking accumulating estimated characters.
///
/// The note that first pushes the running total over the budget is still
/// included; accumulation stops after it once `min_notes` notes have been
/// accepted. Below `min_notes` the walk continues past the budget.
fn apply_length_budget(ranked: Vec<NoteScore>, criteria: &SelectionCriteria) -> Vec<NoteScore> {
    let mut total_chars = 0usize;
    let mut accepted = Vec::new();

    for score in ranked {
        total_chars += score.estimated_chars();
        accepted.push(score);

        if total_chars > criteria.max_email_length_chars && accepted.len() >= criteria.min_notes {
            debug!(
                selected_count = accepted.len(),
                estimated_chars = total_chars,
                "Stopping selection at email length budget"
            );
            break;
        }
    }

    accepted
}

/// Summary statistics over a batch of scored notes.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionStats {
    pub total_notes: usize,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub avg_word_count: f64,
    pub avg_freshness_days: f64,
    pub importance_distribution: HashMap<ImportanceTier, usize>,
}

impl SelectionStats {
    /// Compute statistics for a scored batch. Empty input yields zeroes.
    pub fn from_scores(scored: &[NoteScore]) -> Self {
        if scored.is_empty() {
            return Self {
                total_notes: 0,
                avg_score: 0.0,
                max_score: 0.0,
                min_score: 0.0,
                avg_word_count: 0.0,
                avg_freshness_days: 0.0,
                importance_distribution: HashMap::new(),
            };
        }

        let n = scored.len() as f64;
        let mut distribution: HashMap<ImportanceTier, usize> = HashMap::new();
        for score in scored {
            *distribution.entry(score.metrics.importance).or_default() += 1;
        }

        Self {
            total_notes: scored.len(),
            avg_score: scored.iter().map(|s| s.total_score).sum::<f64>() / n,
            max_score: scored
                .iter()
                .map(|s| s.total_score)
                .fold(f64::NEG_INFINITY, f64::max),
            min_score: scored
                .iter()
                .map(|s| s.total_score)
                .fold(f64::INFINITY, f64::min),
            avg_word_count: scored
                .iter()
                .map(|s| s.metrics.word_count as f64)
                .sum::<f64>()
                / n,
            avg_freshness_days: scored
                .iter()
                .map(|s| s.metrics.freshness_days as f64)
                .sum::<f64>()
                / n,
            importance_distribution: distribution,
        }
    }
}
