//! Inference engines over the accumulated guess history.
//!
//! Both engines are deterministic functions of an [`InferenceContext`]; any
//! caching is layered on top through [`crate::cache::Memoized`].

mod constraint;
mod logical;
mod probabilistic;
pub mod utils;

pub use constraint::{
    Constraint, ConstraintKind, ConstraintSet, ConstraintSource, Deductions, deduce_known,
    derive_constraints,
};
pub use logical::{LogicalConfig, LogicalInference};
pub use probabilistic::{ProbabilisticConfig, ProbabilisticInference};

use crate::model::{GuessRecord, KeywordIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything an engine may look at: one player's knowledge at one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InferenceContext {
    pub keyword_count: usize,
    pub answer_count: usize,
    pub own_hints: BTreeSet<KeywordIndex>,
    pub other_hints: BTreeSet<KeywordIndex>,
    pub revealed_answers: BTreeSet<KeywordIndex>,
    pub revealed_wrongs: BTreeSet<KeywordIndex>,
    pub history: Vec<GuessRecord>,
    #[serde(default)]
    pub extra_constraints: Vec<Constraint>,
}

impl InferenceContext {
    pub fn new(keyword_count: usize, answer_count: usize) -> Self {
        Self {
            keyword_count,
            answer_count,
            ..Self::default()
        }
    }

    pub fn with_guess(mut self, player_id: u32, guess: &[KeywordIndex], correct: usize) -> Self {
        self.history.push(GuessRecord::new(player_id, guess, correct));
        self
    }

    pub fn with_hints(mut self, hints: &[KeywordIndex]) -> Self {
        self.own_hints.extend(hints.iter().copied());
        self
    }

    /// Base prior probability for an unconstrained keyword.
    pub fn prior(&self) -> f64 {
        if self.keyword_count == 0 {
            0.0
        } else {
            self.answer_count as f64 / self.keyword_count as f64
        }
    }
}

/// Why a logical search stopped before covering the full solution space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    SolutionCap,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Marginal answer probability, one entry per keyword index.
    pub probabilities: Vec<f64>,
    pub certain_answers: BTreeSet<KeywordIndex>,
    pub certain_wrongs: BTreeSet<KeywordIndex>,
    pub candidate_solutions: Option<Vec<Vec<KeywordIndex>>>,
    pub recommended_guess: Vec<KeywordIndex>,
    pub confidence: f64,
    pub truncation: Option<Truncation>,
}

impl InferenceResult {
    pub(crate) fn uninformed(ctx: &InferenceContext) -> Self {
        Self {
            probabilities: vec![ctx.prior(); ctx.keyword_count],
            certain_answers: BTreeSet::new(),
            certain_wrongs: BTreeSet::new(),
            candidate_solutions: Some(Vec::new()),
            recommended_guess: Vec::new(),
            confidence: 0.0,
            truncation: None,
        }
    }

    pub fn probability(&self, index: KeywordIndex) -> f64 {
        self.probabilities.get(index).copied().unwrap_or(0.0)
    }

    /// Search did not cover every solution; certainty is limited to what the
    /// constraints fix directly.
    pub fn degraded(&self) -> bool {
        self.truncation.is_some()
    }

    pub fn solution_count(&self) -> Option<usize> {
        self.candidate_solutions.as_ref().map(Vec::len)
    }

    /// No consistent assignment exists.
    pub fn is_contradictory(&self) -> bool {
        self.solution_count() == Some(0)
    }

    /// Keywords that are neither certain answers nor certain wrongs.
    pub fn unresolved(&self) -> Vec<KeywordIndex> {
        (0..self.probabilities.len())
            .filter(|index| {
                !self.certain_answers.contains(index) && !self.certain_wrongs.contains(index)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Logical,
    Probabilistic,
}

/// Shared capability of both engines so strategies can swap them.
pub trait InferenceEngine {
    fn kind(&self) -> EngineKind;

    fn infer(&mut self, ctx: &InferenceContext) -> InferenceResult;

    fn reset(&mut self);
}
