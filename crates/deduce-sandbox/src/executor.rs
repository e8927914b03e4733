use crate::engine::{ENTRY_POINT, Hooks, build_engine};
use crate::limits::SandboxLimits;
use crate::monitor::{ExecutionMetrics, GlobalStats, PerformanceMonitor, PlayerStats};
use crate::postprocess::{raw_indices, sanitize_guess};
use crate::sample::sample_view;
use crate::snapshot::state_map;
use crate::validator::{SnippetRejected, SnippetValidator, ValidationReport};
use deduce_core::{KeywordIndex, PlayerId, PlayerView};
use parking_lot::Mutex;
use rand::Rng;
use rhai::{Dynamic, EvalAltResult, Scope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxExecutionError {
    #[error(transparent)]
    Rejected(#[from] SnippetRejected),
    #[error("snippet exceeded its {limit_ms} ms budget")]
    Timeout { limit_ms: u64 },
    #[error("snippet failed: {0}")]
    Runtime(String),
    #[error("snippet returned an unusable value: {0}")]
    Malformed(String),
    #[error("sandbox worker failed: {0}")]
    Join(String),
}

impl SandboxExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SandboxExecutionError::Rejected(_) => "rejected",
            SandboxExecutionError::Timeout { .. } => "timeout",
            SandboxExecutionError::Runtime(_) => "runtime",
            SandboxExecutionError::Malformed(_) => "malformed",
            SandboxExecutionError::Join(_) => "join",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub raw: Vec<i64>,
    pub guess: Vec<KeywordIndex>,
    pub dropped: usize,
    pub padded: usize,
    pub logs: Vec<String>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

/// A guess that is always usable, plus what went wrong on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOutcome {
    pub guess: Vec<KeywordIndex>,
    pub fallback: bool,
    pub error: Option<SandboxExecutionError>,
    pub logs: Vec<String>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetTrial {
    pub output: ExecutionOutput,
    pub keywords: Vec<String>,
}

/// Runs player snippets one at a time on a blocking worker, each against a
/// fresh interpreter and a fresh copy of the state.
#[derive(Debug)]
pub struct SandboxExecutor {
    limits: SandboxLimits,
    validator: SnippetValidator,
    monitor: Mutex<PerformanceMonitor>,
}

impl SandboxExecutor {
    pub fn new(limits: SandboxLimits) -> Result<Self, regex::Error> {
        Ok(Self {
            validator: SnippetValidator::new(limits.clone())?,
            limits,
            monitor: Mutex::new(PerformanceMonitor::default()),
        })
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    pub fn validate(&self, code: &str) -> Result<ValidationReport, SnippetRejected> {
        self.validator.validate(code)
    }

    pub async fn execute(
        &self,
        player_id: PlayerId,
        code: &str,
        view: &PlayerView,
    ) -> Result<ExecutionOutput, SandboxExecutionError> {
        let started = Instant::now();
        let result = self.run(code, view).await;
        let elapsed = started.elapsed();
        self.monitor.lock().record(ExecutionMetrics {
            player_id,
            elapsed,
            error_kind: result.as_ref().err().map(SandboxExecutionError::kind),
        });
        if let Ok(output) = &result {
            log_success(player_id, view.current_turn, output);
        }
        result
    }

    /// Never fails: any sandbox error is replaced by a reveal-aware random
    /// guess.
    pub async fn execute_with_fallback<R: Rng + ?Sized>(
        &self,
        player_id: PlayerId,
        code: &str,
        view: &PlayerView,
        rng: &mut R,
    ) -> SandboxOutcome {
        let started = Instant::now();
        match self.execute(player_id, code, view).await {
            Ok(output) => SandboxOutcome {
                guess: output.guess,
                fallback: false,
                error: None,
                logs: output.logs,
                elapsed: output.elapsed,
            },
            Err(err) => {
                tracing::warn!(
                    target: "deduce_sandbox::exec",
                    player = player_id,
                    turn = view.current_turn,
                    reason = err.kind(),
                    message = %err
                );
                SandboxOutcome {
                    guess: view.fallback_guess(rng),
                    fallback: true,
                    error: Some(err),
                    logs: Vec::new(),
                    elapsed: started.elapsed(),
                }
            }
        }
    }

    /// Validates and runs `code` against a built-in sample position without
    /// touching the performance history.
    pub async fn test_snippet(&self, code: &str) -> Result<SnippetTrial, SandboxExecutionError> {
        let view = sample_view();
        let output = self.run(code, &view).await?;
        let keywords = output
            .guess
            .iter()
            .filter_map(|&index| view.keywords.get(index).cloned())
            .collect();
        Ok(SnippetTrial { output, keywords })
    }

    pub fn player_stats(&self, player_id: PlayerId) -> PlayerStats {
        self.monitor.lock().player_stats(player_id)
    }

    pub fn global_stats(&self) -> GlobalStats {
        self.monitor.lock().global_stats()
    }

    async fn run(
        &self,
        code: &str,
        view: &PlayerView,
    ) -> Result<ExecutionOutput, SandboxExecutionError> {
        let started = Instant::now();
        let report = self.validator.validate(code)?;

        let hooks = Hooks::default();
        let _cancel = CancelOnDrop(Arc::clone(&hooks.cancel));
        let worker_hooks = hooks.clone();
        let limits = self.limits.clone();
        let code = code.to_string();
        let state = state_map(view);
        let task = tokio::task::spawn_blocking(move || {
            let engine = build_engine(&limits, Some(&worker_hooks));
            let ast = engine
                .compile(&code)
                .map_err(|err| SandboxExecutionError::Runtime(err.to_string()))?;
            engine
                .call_fn::<Dynamic>(&mut Scope::new(), &ast, ENTRY_POINT, (state,))
                .map_err(|err| classify(*err, limits.timeout_ms))
        });

        let value = match tokio::time::timeout(self.limits.timeout(), task).await {
            Err(_) => {
                // The worker notices on its next progress check and unwinds.
                return Err(SandboxExecutionError::Timeout {
                    limit_ms: self.limits.timeout_ms,
                });
            }
            Ok(Err(join)) => return Err(SandboxExecutionError::Join(join.to_string())),
            Ok(Ok(result)) => result?,
        };

        let raw =
            raw_indices(value).map_err(|err| SandboxExecutionError::Malformed(err.to_string()))?;
        let sanitized = sanitize_guess(&raw, view);
        let logs = std::mem::take(&mut *hooks.logs.lock());
        Ok(ExecutionOutput {
            raw,
            guess: sanitized.guess,
            dropped: sanitized.dropped,
            padded: sanitized.padded,
            logs,
            warnings: report.warnings,
            elapsed: started.elapsed(),
        })
    }
}

/// Stops an abandoned worker when the awaiting future is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn classify(err: EvalAltResult, limit_ms: u64) -> SandboxExecutionError {
    match err {
        EvalAltResult::ErrorTerminated(..) | EvalAltResult::ErrorTooManyOperations(..) => {
            SandboxExecutionError::Timeout { limit_ms }
        }
        other => SandboxExecutionError::Runtime(other.to_string()),
    }
}

fn log_success(player_id: PlayerId, turn: u32, output: &ExecutionOutput) {
    if output.dropped > 0 || output.padded > 0 {
        tracing::warn!(
            target: "deduce_sandbox::exec",
            player = player_id,
            turn,
            reason = "sanitized",
            dropped = output.dropped,
            padded = output.padded,
            message = "snippet result repaired"
        );
    }

    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "deduce_sandbox::exec",
        Level::INFO,
        player = player_id,
        turn,
        elapsed_ms = output.elapsed.as_millis() as u64,
        guess = ?output.guess,
        warnings = output.warnings.len(),
        log_lines = output.logs.len(),
    );
}
