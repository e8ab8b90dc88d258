#![forbid(unsafe_code)]

//! Core domain model and business logic for the lift strength tracker.
//!
//! This crate provides:
//! - Domain types (exercises, templates, sets, sessions, active workout)
//! - The built-in catalog and its validation
//! - Target-rep estimation and the 12/8/8 progression milestone
//! - The workout controller state machine with rest timing
//! - Persistence (active workout snapshot, JSONL session history)
//! - History review views and edits

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod active;
pub mod history;
pub mod estimator;
pub mod timer;
pub mod controller;
pub mod review;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog};
pub use config::{Config, ProgressionConfig};
pub use active::{ActiveWorkoutStore, FileActiveStore};
pub use history::{HistoryStore, JsonlHistoryStore};
pub use estimator::{estimate_target_reps, TargetQuery};
pub use timer::{NoopNotifier, RestNotice, RestNotifier, SignalFileNotifier, ThreadNotifier};
pub use controller::{TickOutcome, WorkoutController, WorkoutEvent, WorkoutPhase};
