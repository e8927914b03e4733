//! Move selection for built-in players.

mod dedupe;
mod easy;
mod hard;
mod medium;
mod planning;

pub use dedupe::DuplicateResolution;
pub use planning::{GamePhase, StrategicRecommendation, plan};

use crate::candidates::CandidatePool;
use crate::config::{EngineChoice, StrategyConfig};
use crate::difficulty::Difficulty;
use crate::memory::StrategyMemory;
use deduce_core::inference::LogicalConfig;
use deduce_core::{
    InferenceEngine, KeywordIndex, LogicalInference, Memoized, PlayerId, PlayerView,
    ProbabilisticInference,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("player {player_id} needs {needed} candidate keywords but only {available} remain")]
    InsufficientCandidates {
        player_id: PlayerId,
        needed: usize,
        available: usize,
    },
}

/// What a tier proposes before duplicate avoidance.
#[derive(Debug, Clone)]
pub(crate) struct TierPick {
    pub guess: Vec<KeywordIndex>,
    /// Index-addressed desirability, used to pick substitutes.
    pub scores: Vec<f64>,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub guess: Vec<KeywordIndex>,
    pub reason: &'static str,
    pub resolution: DuplicateResolution,
}

/// Skill-tiered guess selection. One instance per built-in player.
#[derive(Debug)]
pub struct StrategyEngine {
    difficulty: Difficulty,
    config: StrategyConfig,
    logical: Memoized<LogicalInference>,
    bayesian: Memoized<ProbabilisticInference>,
    rng: StdRng,
}

impl StrategyEngine {
    pub fn new(difficulty: Difficulty, config: StrategyConfig, seed: u64) -> Self {
        let config = config.sanitized();
        let logical = LogicalInference::new(LogicalConfig {
            max_solutions: config.max_solutions,
            timeout: config.solver_timeout_ms.map(Duration::from_millis),
        });
        Self {
            difficulty,
            logical: Memoized::new(logical).enabled(config.cache_enabled),
            bayesian: Memoized::new(ProbabilisticInference::default())
                .enabled(config.cache_enabled),
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Returns exactly `answer_count` distinct candidate indices.
    pub fn select_guess(
        &mut self,
        view: &PlayerView,
        memory: &mut StrategyMemory,
    ) -> Result<Decision, StrategyError> {
        let pool = CandidatePool::from_view(view);
        let needed = view.answer_count;
        if pool.len() < needed {
            return Err(StrategyError::InsufficientCandidates {
                player_id: view.player_id,
                needed,
                available: pool.len(),
            });
        }

        let pick = match self.difficulty {
            Difficulty::Easy => easy::pick(view, &pool, memory, &self.config, &mut self.rng),
            Difficulty::Medium => medium::pick(view, &pool, &self.config),
            Difficulty::Hard => {
                let outcome = match self.config.engine {
                    EngineChoice::Logical => {
                        hard::pick(view, &pool, &self.config, &mut self.logical)
                    }
                    EngineChoice::Bayesian => {
                        hard::pick(view, &pool, &self.config, &mut self.bayesian)
                    }
                };
                if outcome.fell_back {
                    memory.note_fallback();
                }
                outcome.pick
            }
        };
        let pick = complete(pick, &pool, needed);

        let (guess, resolution) = dedupe::avoid_duplicates(
            &pick.guess,
            &pick.scores,
            pool.valid(),
            &view.previous_guesses,
            self.config.duplicate_attempts,
            &mut self.rng,
        );
        memory.record(&guess, pick.reason, resolution);
        log_selection(view, self.difficulty, &guess, pick.reason, resolution, pool.len());

        Ok(Decision {
            guess,
            reason: pick.reason,
            resolution,
        })
    }

    pub fn reset(&mut self) {
        self.logical.reset();
        self.bayesian.reset();
    }
}

/// Drops anything outside the pool and tops up by score.
fn complete(mut pick: TierPick, pool: &CandidatePool, needed: usize) -> TierPick {
    let mut guess: Vec<KeywordIndex> = Vec::with_capacity(needed);
    for index in pick.guess.drain(..) {
        if pool.contains(index) && !guess.contains(&index) && guess.len() < needed {
            guess.push(index);
        }
    }
    if guess.len() < needed {
        for index in pool.ranked(&pick.scores) {
            if guess.len() >= needed {
                break;
            }
            if !guess.contains(&index) {
                guess.push(index);
            }
        }
    }
    guess.sort_unstable();
    pick.guess = guess;
    pick
}

fn log_selection(
    view: &PlayerView,
    difficulty: Difficulty,
    guess: &[KeywordIndex],
    reason: &str,
    resolution: DuplicateResolution,
    pool_size: usize,
) {
    if resolution == DuplicateResolution::Repeated {
        tracing::warn!(
            target: "deduce_bot::select",
            player = view.player_id,
            turn = view.current_turn,
            reason = "duplicate_accepted",
            message = "no unseen guess found; resubmitting a previous guess"
        );
    }

    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "deduce_bot::select",
        Level::INFO,
        player = view.player_id,
        turn = view.current_turn,
        difficulty = %difficulty,
        guess = ?guess,
        reason,
        resolution = ?resolution,
        pool_size,
        history = view.previous_guesses.len(),
    );
}
