//! Validation and isolated execution of player-supplied guessing scripts.
//!
//! A snippet is a Rhai script defining `fn make_guess(state)` that returns an
//! array of keyword indices.

mod engine;
mod executor;
mod limits;
mod monitor;
mod postprocess;
mod sample;
mod snapshot;
mod validator;

pub use executor::{
    ExecutionOutput, SandboxExecutionError, SandboxExecutor, SandboxOutcome, SnippetTrial,
};
pub use limits::SandboxLimits;
pub use monitor::{ExecutionMetrics, GlobalStats, PerformanceMonitor, PlayerStats};
pub use postprocess::{Sanitized, sanitize_guess};
pub use sample::sample_view;
pub use validator::{FORBIDDEN_PATTERNS, SnippetRejected, SnippetValidator, ValidationReport};
