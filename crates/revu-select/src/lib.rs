//! # revu-select
//!
//! Content analysis and note selection engine for revu.
//!
//! This crate provides:
//! - Structural and semantic content metrics per note (word/header/code/link
//!   counts, importance tier, readability, freshness)
//! - Duplicate-content detection over a whitespace-normalized content hash
//! - Weighted multi-criteria scoring with bounded top-K selection under an
//!   email length budget
//!
//! ## Example
//!
//! ```ignore
//! use revu_select::{ContentAnalyzer, SelectionAlgorithm, SelectionCriteria};
//!
//! let mut selector = SelectionAlgorithm::new(ContentAnalyzer::new());
//! let criteria = SelectionCriteria::default().with_max_notes(5);
//! let ranked = selector.select(&candidates, &criteria);
//! for score in &ranked {
//!     println!("{} -> {:.1}", score.file_path, score.total_score);
//! }
//! ```

pub mod algorithm;
pub mod analyzer;
pub mod criteria;

pub use algorithm::{SelectionAlgorithm, SelectionStats};
pub use analyzer::{ContentAnalyzer, ContentMetrics, ImportanceTier};
pub use criteria::{NoteScore, SelectionCriteria};
