//! Content analysis engine for note evaluation.
//!
//! Computes per-note structural metrics, classifies importance from keyword
//! occurrences, estimates readability, and maintains the duplicate-content
//! index (path ↔ content hash).

use std::collections::HashMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use revu_core::defaults;
use revu_core::Note;

/// Keywords whose presence anywhere in the content marks a note Critical.
///
/// Matching is substring-based, not word-boundary-based: "deadlines" counts
/// as "deadline". Kept intentionally; see the importance tests.
const CRITICAL_KEYWORDS: &[&str] = &[
    "urgent",
    "critical",
    "important",
    "deadline",
    "asap",
    "emergency",
    "breaking",
    "alert",
    "warning",
    "error",
    "bug",
    "issue",
    "problem",
];

/// Keywords indicating high importance (two or more occurrences required).
const HIGH_KEYWORDS: &[&str] = &[
    "meeting",
    "presentation",
    "interview",
    "review",
    "decision",
    "action",
    "follow-up",
    "milestone",
    "release",
    "launch",
    "deploy",
    "fix",
];

/// Keywords indicating medium importance.
const MEDIUM_KEYWORDS: &[&str] = &[
    "idea",
    "note",
    "research",
    "analysis",
    "summary",
    "plan",
    "draft",
    "concept",
    "proposal",
    "suggestion",
    "feedback",
    "update",
];

static HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+.+$").expect("valid header regex"));

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```|`[^`]+`").expect("valid code regex"));

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]\([^)]+\)|https?://\S+").expect("valid link regex"));

static TODO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)(?:^|\s)(?:TODO|FIXME|XXX|NOTE):").expect("valid todo regex"));

static SENTENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));

static SYLLABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[aeiou]+").expect("valid syllable regex"));

/// Importance tier derived from keyword scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceTier {
    Critical,
    High,
    Medium,
    Low,
}

impl ImportanceTier {
    /// Fixed multiplier applied inside the content score.
    ///
    /// Independent from the configurable importance-score multipliers on
    /// [`SelectionCriteria`](crate::SelectionCriteria).
    pub fn content_multiplier(self) -> f64 {
        match self {
            ImportanceTier::Critical => 1.5,
            ImportanceTier::High => 1.2,
            ImportanceTier::Medium => 1.0,
            ImportanceTier::Low => 0.8,
        }
    }
}

/// Content analysis metrics for a single note.
///
/// Recomputed on every analysis call; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// SHA-256 over whitespace-normalized content, hex-encoded.
    pub content_hash: String,
    pub word_count: usize,
    pub line_count: usize,
    pub code_blocks: usize,
    pub headers: usize,
    pub links: usize,
    pub todo_items: usize,
    /// Total occurrences of importance keywords across all three tiers.
    pub importance_keywords: usize,
    /// Simplified Flesch Reading Ease, clamped to [0, 100].
    pub readability_score: f64,
    /// Days since last modification.
    pub freshness_days: i64,
    pub importance: ImportanceTier,
}

impl ContentMetrics {
    /// Overall content quality score (0-100).
    ///
    /// Structure, depth, and TODO engagement components, each capped, then
    /// boosted by the importance tier multiplier.
    pub fn content_score(&self) -> f64 {
        let structure =
            ((self.headers * 5 + self.code_blocks * 3 + self.links * 2) as f64).min(50.0);
        let depth = (self.word_count as f64 / 10.0).min(30.0);
        let todo = ((self.todo_items * 3) as f64).min(20.0);

        ((structure + depth + todo) * self.importance.content_multiplier()).min(100.0)
    }

    /// Recency score (0-100), piecewise over days since modification.
    ///
    /// Monotonically non-increasing in `freshness_days`.
    pub fn freshness_score(&self) -> f64 {
        let d = self.freshness_days;
        if d <= 0 {
            100.0
        } else if d <= 7 {
            90.0 - (d as f64 * 5.0)
        } else if d <= 30 {
            55.0 - ((d - 7) as f64 * 1.5)
        } else if d <= 90 {
            20.0 - ((d - 30) as f64 * 0.2)
        } else {
            (5.0 - ((d - 90) as f64 * 0.05)).max(0.0)
        }
    }
}

/// Content analysis engine owning the duplicate-content index.
///
/// The index maps each analyzed path to its latest content hash and each
/// hash to the set of paths carrying it. Invariant: a path appears in at
/// most one hash bucket at a time; re-analysis of a changed file moves it.
#[derive(Debug, Default)]
pub struct ContentAnalyzer {
    /// path -> latest content hash
    hashes: HashMap<String, String>,
    /// content hash -> paths with that content
    groups: HashMap<String, Vec<String>>,
}

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze a note's content and update the duplicate index.
    ///
    /// When `content` is `None` the note's file is read from disk. A read
    /// failure yields degraded metrics (stale freshness sentinel, Low tier,
    /// zero counts) rather than an error; callers treat such notes as
    /// unscored low priority.
    pub fn analyze(&mut self, note: &Note, content: Option<&str>) -> ContentMetrics {
        let owned;
        let content = match content {
            Some(c) => c,
            None => match std::fs::read_to_string(&note.file_path) {
                Ok(c) => {
                    owned = c;
                    &owned
                }
                Err(e) => {
                    warn!(
                        note_path = %note.file_path,
                        error = %e,
                        "Note file unreadable, returning degraded metrics"
                    );
                    return Self::degraded_metrics(&note.content_hash);
                }
            },
        };

        let content_hash = content_hash(content);
        self.track_duplicate(&note.file_path, &content_hash);

        let word_count = content.split_whitespace().count();
        let line_count = content.lines().count();

        let headers = HEADER_PATTERN.find_iter(content).count();
        let code_blocks = CODE_PATTERN.find_iter(content).count();
        let links = LINK_PATTERN.find_iter(content).count();
        let todo_items = TODO_PATTERN.find_iter(content).count();

        let lowered = content.to_lowercase();
        let importance_keywords = count_keywords(&lowered);
        let importance = classify_importance(&lowered);

        let readability_score = readability(content, word_count);
        let freshness_days = note.days_since_modification(Utc::now());

        let metrics = ContentMetrics {
            content_hash,
            word_count,
            line_count,
            code_blocks,
            headers,
            links,
            todo_items,
            importance_keywords,
            readability_score,
            freshness_days,
            importance,
        };

        debug!(
            note_path = %note.file_path,
            word_count,
            importance = ?importance,
            freshness_days,
            "Content analysis complete"
        );

        metrics
    }

    /// Whether the path's latest content is shared by at least one other path.
    pub fn is_duplicate(&self, file_path: &str) -> bool {
        self.hashes
            .get(file_path)
            .and_then(|hash| self.groups.get(hash))
            .is_some_and(|paths| paths.len() > 1)
    }

    /// Groups of paths with identical content (only groups with >1 member).
    pub fn duplicate_groups(&self) -> HashMap<String, Vec<String>> {
        self.groups
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(hash, paths)| (hash.clone(), paths.clone()))
            .collect()
    }

    /// Whether `new_content` differs from the last analyzed content for the
    /// path, along with the new hash. Paths never analyzed count as changed.
    pub fn content_changed(&self, file_path: &str, new_content: &str) -> (bool, String) {
        let new_hash = content_hash(new_content);
        let changed = self.hashes.get(file_path) != Some(&new_hash);
        (changed, new_hash)
    }

    /// Drop all duplicate-index state.
    pub fn clear(&mut self) {
        self.hashes.clear();
        self.groups.clear();
        debug!("Content analyzer index cleared");
    }

    /// Move the path to its new hash bucket, removing the stale membership.
    fn track_duplicate(&mut self, file_path: &str, new_hash: &str) {
        if let Some(old_hash) = self.hashes.get(file_path) {
            if old_hash == new_hash {
                return;
            }
            if let Some(paths) = self.groups.get_mut(old_hash) {
                paths.retain(|p| p != file_path);
                if paths.is_empty() {
                    self.groups.remove(old_hash);
                }
            }
        }

        self.hashes
            .insert(file_path.to_string(), new_hash.to_string());
        self.groups
            .entry(new_hash.to_string())
            .or_default()
            .push(file_path.to_string());
    }

    fn degraded_metrics(stored_hash: &str) -> ContentMetrics {
        ContentMetrics {
            content_hash: stored_hash.to_string(),
            word_count: 0,
            line_count: 0,
            code_blocks: 0,
            headers: 0,
            links: 0,
            todo_items: 0,
            importance_keywords: 0,
            readability_score: 0.0,
            freshness_days: defaults::DEGRADED_FRESHNESS_DAYS,
            importance: ImportanceTier::Low,
        }
    }
}

/// SHA-256 over trimmed content with line endings normalized to `\n`.
fn content_hash(content: &str) -> String {
    let normalized = content.trim().replace("\r\n", "\n");
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

/// Total occurrences of keywords across all three tiers.
///
/// Substring occurrence counting over lowercased content.
fn count_keywords(lowered: &str) -> usize {
    CRITICAL_KEYWORDS
        .iter()
        .chain(HIGH_KEYWORDS)
        .chain(MEDIUM_KEYWORDS)
        .map(|kw| lowered.matches(kw).count())
        .sum()
}

/// Classify the importance tier from keyword occurrences.
///
/// Any critical keyword makes the note Critical; two or more high keywords
/// make it High; one high keyword or any medium keyword makes it Medium.
fn classify_importance(lowered: &str) -> ImportanceTier {
    let critical: usize = CRITICAL_KEYWORDS
        .iter()
        .map(|kw| lowered.matches(kw).count())
        .sum();
    if critical > 0 {
        return ImportanceTier::Critical;
    }

    let high: usize = HIGH_KEYWORDS
        .iter()
        .map(|kw| lowered.matches(kw).count())
        .sum();
    if high >= 2 {
        return ImportanceTier::High;
    }

    let medium: usize = MEDIUM_KEYWORDS
        .iter()
        .map(|kw| lowered.matches(kw).count())
        .sum();
    if medium >= 1 || high == 1 {
        return ImportanceTier::Medium;
    }

    ImportanceTier::Low
}

/// Simplified Flesch Reading Ease estimate, clamped to [0, 100].
///
/// Sentences are runs of terminal punctuation; syllables are vowel runs.
fn readability(content: &str, word_count: usize) -> f64 {
    if word_count == 0 {
        return 0.0;
    }

    let sentence_count = SENTENCE_PATTERN.find_iter(content).count().max(1);
    let mut syllable_count = SYLLABLE_PATTERN.find_iter(content).count();
    if syllable_count == 0 {
        syllable_count = word_count;
    }

    let avg_sentence_length = word_count as f64 / sentence_count as f64;
    let avg_syllables_per_word = syllable_count as f64 / word_count as f64;

    let score = 206.835 - 1.015 * avg_sentence_length - 84.6 * avg_syllables_per_word;
    score.clamp(0.0, 100.0)
}
