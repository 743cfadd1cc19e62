//! Domain model for logged entries and scoring.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep task and mood items in one entry-centric shape.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - Soft deletion is a status (`Deleted`), hard deletion removes the row.

pub mod entry;
pub mod score;
