//! State module for tracking pipeline progress
//!
//! This module provides the status vocabulary for staged identifiers and the
//! terminal outcome of an orchestrator run.
//!
//! # Components
//!
//! - `StageStatus`: Tracks the lifecycle of a staged identifier (pending, processing, completed, etc.)
//! - `RunOutcome`: Distinguishes a normally completed run from one aborted on access denial

mod run_state;
mod stage_status;

// Re-export main types
pub use run_state::RunOutcome;
pub use stage_status::StageStatus;
