//! Phase-aware guess planning on top of an inference result.

use crate::candidates::CandidatePool;
use deduce_core::inference::utils::{
    diversity_score, expected_info_gain, guess_frequency, player_pattern, risk_level,
    uncertainty,
};
use deduce_core::{InferenceResult, KeywordIndex, PlayerView};
use serde::Serialize;

const EARLY_PROGRESS: f64 = 0.3;
const MIDDLE_PROGRESS: f64 = 0.7;
const EARLY_TURNS: u32 = 3;
const MIDDLE_TURNS: u32 = 10;
const MIN_DIVERSITY: f64 = 0.3;
const BAND_BONUS: f64 = 0.1;
const REPEAT_PENALTY: f64 = 0.02;
const OPPONENT_THREAT_RATE: f64 = 0.6;
const THREAT_RISK_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Early,
    Middle,
    Late,
}

impl GamePhase {
    pub fn from_turn(current_turn: u32, max_turns: Option<u32>) -> Self {
        match max_turns {
            Some(max) if max > 0 => {
                let progress = current_turn as f64 / max as f64;
                if progress <= EARLY_PROGRESS {
                    GamePhase::Early
                } else if progress <= MIDDLE_PROGRESS {
                    GamePhase::Middle
                } else {
                    GamePhase::Late
                }
            }
            _ => {
                if current_turn <= EARLY_TURNS {
                    GamePhase::Early
                } else if current_turn <= MIDDLE_TURNS {
                    GamePhase::Middle
                } else {
                    GamePhase::Late
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategicRecommendation {
    pub guess: Vec<KeywordIndex>,
    pub reason: &'static str,
    pub phase: GamePhase,
    pub expected_info_gain: f64,
    pub risk_level: f64,
}

/// Picks a guess for the current phase. A middle-phase player whose
/// opponents are scoring well switches to late-phase play, and the reported
/// risk is raised for every phase while that holds.
pub fn plan(
    view: &PlayerView,
    result: &InferenceResult,
    pool: &CandidatePool,
) -> StrategicRecommendation {
    let phase = GamePhase::from_turn(view.current_turn, view.max_turns);
    let threatened = opponents_threatening(view);
    let open: Vec<KeywordIndex> = pool
        .valid()
        .iter()
        .copied()
        .filter(|index| !result.certain_wrongs.contains(index))
        .collect();
    let p = |index: KeywordIndex| result.probability(index);

    let (guess, reason) = match (phase, threatened) {
        (GamePhase::Early, _) => (explore(view, &open, &p), "early_exploration"),
        (GamePhase::Middle, false) => balanced(view, result, &open, pool),
        (GamePhase::Middle, true) => (commit(view, result, &open), "late_race"),
        (GamePhase::Late, _) => (commit(view, result, &open), "late_commit"),
    };

    let mut risk = risk_level(&result.probabilities, &guess);
    if threatened {
        risk = (risk * THREAT_RISK_FACTOR).min(1.0);
    }

    StrategicRecommendation {
        expected_info_gain: expected_info_gain(&result.probabilities, &guess),
        risk_level: risk,
        guess,
        reason,
        phase,
    }
}

/// Average correct rate across opponents is above the threat line.
fn opponents_threatening(view: &PlayerView) -> bool {
    let mut opponents: Vec<u32> = view
        .previous_guesses
        .iter()
        .map(|record| record.player_id)
        .filter(|&id| id != view.player_id)
        .collect();
    opponents.sort_unstable();
    opponents.dedup();
    if opponents.is_empty() {
        return false;
    }
    let total: f64 = opponents
        .iter()
        .map(|&id| {
            player_pattern(&view.previous_guesses, id, view.answer_count).average_correct_rate
        })
        .sum();
    total / opponents.len() as f64 > OPPONENT_THREAT_RATE
}

/// Most uncertain keywords, reshuffled towards untried ones when the guess
/// overlaps too much with history.
fn explore<F>(view: &PlayerView, open: &[KeywordIndex], p: &F) -> Vec<KeywordIndex>
where
    F: Fn(KeywordIndex) -> f64,
{
    let needed = view.answer_count;
    let mut ranked = open.to_vec();
    ranked.sort_by(|&a, &b| uncertainty(p(b)).total_cmp(&uncertainty(p(a))).then(a.cmp(&b)));
    let mut guess: Vec<KeywordIndex> = ranked.iter().copied().take(needed).collect();

    let history = &view.previous_guesses;
    if diversity_score(&guess, history) < MIN_DIVERSITY {
        let mut alternatives: Vec<KeywordIndex> = ranked
            .iter()
            .copied()
            .filter(|index| !guess.contains(index))
            .collect();
        alternatives.sort_by(|&a, &b| {
            guess_frequency(a, history)
                .cmp(&guess_frequency(b, history))
                .then(uncertainty(p(b)).total_cmp(&uncertainty(p(a))))
                .then(a.cmp(&b))
        });
        let mut slot = guess.len();
        for incoming in alternatives {
            if slot == 0 || diversity_score(&guess, history) >= MIN_DIVERSITY {
                break;
            }
            slot -= 1;
            guess[slot] = incoming;
        }
    }
    guess.sort_unstable();
    guess
}

fn balanced(
    view: &PlayerView,
    result: &InferenceResult,
    open: &[KeywordIndex],
    pool: &CandidatePool,
) -> (Vec<KeywordIndex>, &'static str) {
    let score = |index: KeywordIndex| {
        let p = result.probability(index);
        let band = if (0.4..=0.6).contains(&p) { BAND_BONUS } else { 0.0 };
        p + band - REPEAT_PENALTY * guess_frequency(index, &view.previous_guesses) as f64
    };
    let mut ranked = open.to_vec();
    ranked.sort_by(|&a, &b| score(b).total_cmp(&score(a)).then(a.cmp(&b)));
    let mut guess: Vec<KeywordIndex> = ranked.into_iter().take(view.answer_count).collect();
    guess.sort_unstable();

    let recommended = &result.recommended_guess;
    let usable = recommended.len() == view.answer_count
        && recommended.iter().all(|&index| pool.contains(index))
        && !view.previous_guesses.iter().any(|record| record.matches(recommended));
    if usable
        && expected_info_gain(&result.probabilities, recommended)
            > expected_info_gain(&result.probabilities, &guess)
    {
        return (recommended.clone(), "mid_engine_recommendation");
    }
    (guess, "mid_balanced")
}

/// Known answers first, then keywords above a threshold that drops as turns
/// run out.
fn commit(view: &PlayerView, result: &InferenceResult, open: &[KeywordIndex]) -> Vec<KeywordIndex> {
    let needed = view.answer_count;
    let unresolved = needed.saturating_sub(result.certain_answers.len());
    let threshold = if view.turns_remaining().is_some_and(|left| left <= 3) {
        0.5
    } else if unresolved > 1 {
        0.6
    } else {
        0.7
    };

    let mut ranked = open.to_vec();
    ranked.sort_by(|&a, &b| {
        result
            .probability(b)
            .total_cmp(&result.probability(a))
            .then(a.cmp(&b))
    });

    let mut guess: Vec<KeywordIndex> = open
        .iter()
        .copied()
        .filter(|index| result.certain_answers.contains(index))
        .take(needed)
        .collect();
    for &index in &ranked {
        if guess.len() >= needed {
            break;
        }
        if result.probability(index) >= threshold && !guess.contains(&index) {
            guess.push(index);
        }
    }
    for &index in &ranked {
        if guess.len() >= needed {
            break;
        }
        if !guess.contains(&index) {
            guess.push(index);
        }
    }
    guess.sort_unstable();
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use deduce_core::GuessRecord;
    use std::collections::BTreeSet;

    fn view(turn: u32, history: Vec<GuessRecord>) -> PlayerView {
        PlayerView {
            player_id: 1,
            keywords: (0..8).map(|i| format!("kw{i}")).collect(),
            answer_count: 2,
            my_hints: BTreeSet::new(),
            previous_guesses: history,
            revealed_answers: BTreeSet::new(),
            revealed_wrongs: BTreeSet::new(),
            other_hints: BTreeSet::new(),
            current_turn: turn,
            max_turns: Some(10),
            time_limit_secs: 60,
        }
    }

    fn result(probabilities: Vec<f64>) -> InferenceResult {
        InferenceResult {
            probabilities,
            certain_answers: BTreeSet::new(),
            certain_wrongs: BTreeSet::new(),
            candidate_solutions: None,
            recommended_guess: Vec::new(),
            confidence: 0.5,
            truncation: None,
        }
    }

    #[test]
    fn phase_follows_turn_ratio() {
        assert_eq!(GamePhase::from_turn(3, Some(10)), GamePhase::Early);
        assert_eq!(GamePhase::from_turn(7, Some(10)), GamePhase::Middle);
        assert_eq!(GamePhase::from_turn(8, Some(10)), GamePhase::Late);
        assert_eq!(GamePhase::from_turn(4, None), GamePhase::Middle);
        assert_eq!(GamePhase::from_turn(11, None), GamePhase::Late);
    }

    #[test]
    fn early_play_targets_uncertain_keywords() {
        let view = view(1, Vec::new());
        let pool = CandidatePool::from_view(&view);
        let probs = vec![0.9, 0.5, 0.1, 0.45, 0.0, 0.0, 0.0, 0.05];
        let rec = plan(&view, &result(probs), &pool);
        assert_eq!(rec.phase, GamePhase::Early);
        assert_eq!(rec.guess, vec![1, 3]);
        assert!(rec.expected_info_gain > 0.9);
    }

    #[test]
    fn early_play_moves_away_from_repeated_sets() {
        let history = vec![GuessRecord::new(2, &[1, 3], 1)];
        let view = view(2, history);
        let pool = CandidatePool::from_view(&view);
        let probs = vec![0.9, 0.5, 0.1, 0.45, 0.0, 0.0, 0.0, 0.05];
        let rec = plan(&view, &result(probs), &pool);
        assert_ne!(rec.guess, vec![1, 3]);
        assert!(diversity_score(&rec.guess, &view.previous_guesses) >= MIN_DIVERSITY);
    }

    #[test]
    fn late_play_commits_to_likely_keywords() {
        let view = view(9, Vec::new());
        let pool = CandidatePool::from_view(&view);
        let probs = vec![0.2, 0.5, 0.1, 0.45, 0.95, 0.0, 0.0, 0.6];
        let rec = plan(&view, &result(probs), &pool);
        assert_eq!(rec.phase, GamePhase::Late);
        assert_eq!(rec.guess, vec![4, 7]);
        assert_eq!(rec.reason, "late_commit");
    }

    #[test]
    fn strong_opponents_trigger_race_mode() {
        let history = vec![GuessRecord::new(2, &[0, 4], 2), GuessRecord::new(2, &[4, 6], 1)];
        let view = view(5, history);
        let pool = CandidatePool::from_view(&view);
        let probs = vec![0.2, 0.5, 0.1, 0.45, 0.95, 0.0, 0.0, 0.6];
        let rec = plan(&view, &result(probs.clone()), &pool);
        assert_eq!(rec.phase, GamePhase::Middle);
        assert_eq!(rec.reason, "late_race");
        let base = risk_level(&probs, &rec.guess);
        assert!((rec.risk_level - (base * THREAT_RISK_FACTOR).min(1.0)).abs() < 1e-12);
    }

    #[test]
    fn one_strong_opponent_among_weak_ones_is_no_threat() {
        let history = vec![
            GuessRecord::new(2, &[0, 4], 2),
            GuessRecord::new(3, &[5, 6], 0),
        ];
        let view = view(5, history);
        assert!(!opponents_threatening(&view));
    }
}
