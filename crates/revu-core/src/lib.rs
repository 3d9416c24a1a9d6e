//! # revu-core
//!
//! Core types, traits, and abstractions for the revu note review system.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other revu crates depend on: the note and send-record models, the
//! shared error taxonomy, default constants, the structured logging schema,
//! and the note store seam.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::{Note, SendRecord};
pub use traits::NoteStore;
