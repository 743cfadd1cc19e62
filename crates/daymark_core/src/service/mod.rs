//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the engine's use-case APIs.
//! - Keep UI layers decoupled from storage details.
//!
//! Services never open transactions themselves; `Journal` wraps each call
//! in one so every operation is atomic.

pub mod completion_service;
pub mod entry_service;
pub mod error;
pub mod focus_service;
pub mod reset_service;
pub mod scoring_service;
pub mod streak;
