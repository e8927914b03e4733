use super::TierPick;
use super::medium;
use super::planning::plan;
use crate::candidates::{CandidatePool, for_each_combination};
use crate::config::StrategyConfig;
use deduce_core::{InferenceEngine, InferenceResult, KeywordIndex, PlayerView};
use std::collections::BTreeSet;

pub(crate) struct HardOutcome {
    pub pick: TierPick,
    pub fell_back: bool,
}

/// Inference-driven selection. Hands over to the medium heuristic when the
/// engine result cannot be trusted.
pub(crate) fn pick<E: InferenceEngine>(
    view: &PlayerView,
    pool: &CandidatePool,
    config: &StrategyConfig,
    engine: &mut E,
) -> HardOutcome {
    let result = engine.infer(&view.inference_context());
    let open: Vec<KeywordIndex> = pool
        .valid()
        .iter()
        .copied()
        .filter(|index| !result.certain_wrongs.contains(index))
        .collect();

    let untrusted = if result.is_contradictory() {
        Some("contradictory")
    } else if result.degraded() {
        Some("degraded")
    } else if open.len() > config.hard_max_candidates {
        Some("too_many_candidates")
    } else {
        None
    };
    if let Some(cause) = untrusted {
        tracing::warn!(
            target: "deduce_bot::select",
            player = view.player_id,
            turn = view.current_turn,
            reason = "hard_fallback",
            cause,
            message = "inference result unusable; using window heuristic"
        );
        let mut pick = medium::pick(view, pool, config);
        pick.reason = "hard_fallback";
        return HardOutcome {
            pick,
            fell_back: true,
        };
    }

    let mut scores = result.probabilities.clone();
    scores.resize(view.keyword_count(), 0.0);
    for (index, score) in scores.iter_mut().enumerate() {
        if !pool.contains(index) {
            *score = f64::NEG_INFINITY;
        }
    }

    if let Some([only]) = result.candidate_solutions.as_deref() {
        return HardOutcome {
            pick: TierPick {
                guess: only.clone(),
                scores,
                reason: "unique_solution",
            },
            fell_back: false,
        };
    }

    let missing = view.answer_count.saturating_sub(result.certain_answers.len());
    let undecided: Vec<KeywordIndex> = open
        .iter()
        .copied()
        .filter(|index| !result.certain_answers.contains(index))
        .collect();
    if missing > 0
        && missing <= config.verification_max_unresolved
        && undecided.len() <= config.verification_max_candidates
    {
        if let Some(pick) = verify(view, &result, &undecided, missing, &scores) {
            return HardOutcome {
                pick,
                fell_back: false,
            };
        }
    }

    let recommendation = plan(view, &result, pool);
    HardOutcome {
        pick: TierPick {
            guess: recommendation.guess,
            scores,
            reason: recommendation.reason,
        },
        fell_back: false,
    }
}

/// Enumerates every completion of the certain answers and keeps the ones
/// consistent with the public record.
fn verify(
    view: &PlayerView,
    result: &InferenceResult,
    undecided: &[KeywordIndex],
    missing: usize,
    scores: &[f64],
) -> Option<TierPick> {
    let base: BTreeSet<KeywordIndex> = result.certain_answers.clone();
    let mut consistent = 0usize;
    let mut best: Option<(f64, Vec<KeywordIndex>)> = None;

    for_each_combination(undecided, missing, |extra| {
        let hypothesis: BTreeSet<KeywordIndex> = base.iter().chain(extra).copied().collect();
        if !explains(view, &hypothesis) {
            return true;
        }
        consistent += 1;
        let weight: f64 = hypothesis.iter().map(|&index| result.probability(index)).sum();
        if best.as_ref().is_none_or(|(top, _)| weight > *top) {
            best = Some((weight, hypothesis.into_iter().collect()));
        }
        true
    });

    let (_, guess) = best?;
    Some(TierPick {
        guess,
        scores: scores.to_vec(),
        reason: if consistent == 1 {
            "verified_unique"
        } else {
            "verified_best"
        },
    })
}

fn explains(view: &PlayerView, hypothesis: &BTreeSet<KeywordIndex>) -> bool {
    view.revealed_answers.is_subset(hypothesis)
        && view.revealed_wrongs.is_disjoint(hypothesis)
        && view.previous_guesses.iter().all(|record| {
            let hits = record
                .guessed
                .iter()
                .filter(|index| hypothesis.contains(index))
                .count();
            hits == record.correct_count
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deduce_core::inference::LogicalConfig;
    use deduce_core::{GuessRecord, LogicalInference};

    fn view(hints: &[usize], history: Vec<GuessRecord>) -> PlayerView {
        PlayerView {
            player_id: 1,
            keywords: (0..10).map(|i| format!("kw{i}")).collect(),
            answer_count: 3,
            my_hints: hints.iter().copied().collect(),
            previous_guesses: history,
            revealed_answers: BTreeSet::new(),
            revealed_wrongs: BTreeSet::new(),
            other_hints: BTreeSet::new(),
            current_turn: 4,
            max_turns: Some(20),
            time_limit_secs: 60,
        }
    }

    fn scenario() -> Vec<GuessRecord> {
        vec![
            GuessRecord::new(1, &[1, 4, 9], 2),
            GuessRecord::new(2, &[2, 4, 7], 2),
            GuessRecord::new(1, &[1, 4, 2], 2),
        ]
    }

    #[test]
    fn unique_solution_is_played() {
        let view = view(&[9], scenario());
        let pool = CandidatePool::from_view(&view);
        let mut engine = LogicalInference::default();
        let outcome = pick(&view, &pool, &StrategyConfig::default(), &mut engine);
        assert!(!outcome.fell_back);
        assert_eq!(outcome.pick.reason, "unique_solution");
        assert_eq!(outcome.pick.guess, vec![1, 4, 7]);
    }

    #[test]
    fn degraded_search_falls_back() {
        let view = view(&[], Vec::new());
        let pool = CandidatePool::from_view(&view);
        let mut engine = LogicalInference::new(LogicalConfig {
            max_solutions: 5,
            timeout: None,
        });
        let outcome = pick(&view, &pool, &StrategyConfig::default(), &mut engine);
        assert!(outcome.fell_back);
        assert_eq!(outcome.pick.reason, "hard_fallback");
    }

    #[test]
    fn verification_filters_inconsistent_completions() {
        let view = view(&[], scenario());
        let hypothesis: BTreeSet<usize> = BTreeSet::from([1, 4, 7]);
        assert!(explains(&view, &hypothesis));
        assert!(!explains(&view, &BTreeSet::from([1, 2, 4])));
    }
}
