use std::collections::BTreeSet;

use deduce_bot::{Difficulty, StrategyConfig, StrategyEngine, StrategyError, StrategyMemory};
use deduce_core::{GuessRecord, PlayerView};

fn view(history: Vec<GuessRecord>, hints: &[usize]) -> PlayerView {
    PlayerView {
        player_id: 1,
        keywords: (0..10).map(|i| format!("kw{i}")).collect(),
        answer_count: 3,
        my_hints: hints.iter().copied().collect(),
        previous_guesses: history,
        revealed_answers: BTreeSet::new(),
        revealed_wrongs: BTreeSet::new(),
        other_hints: BTreeSet::new(),
        current_turn: 2,
        max_turns: Some(12),
        time_limit_secs: 60,
    }
}

#[test]
fn members_of_a_zero_scoring_guess_are_never_reused() {
    let view = view(vec![GuessRecord::new(2, &[2, 3, 5], 0)], &[]);
    for difficulty in Difficulty::ALL {
        for seed in 0..10 {
            let mut engine = StrategyEngine::new(difficulty, StrategyConfig::default(), seed);
            let decision = engine.select_guess(&view, &mut StrategyMemory::new()).unwrap();
            for banned in [2, 3, 5] {
                assert!(!decision.guess.contains(&banned), "{difficulty}: {decision:?}");
            }
        }
    }
}

#[test]
fn exhausted_pool_is_an_error() {
    let view = view(
        vec![GuessRecord::new(2, &[0, 1, 2], 0), GuessRecord::new(2, &[3, 4, 5], 0)],
        &[6, 7],
    );
    let mut engine = StrategyEngine::new(Difficulty::Medium, StrategyConfig::default(), 1);
    let err = engine.select_guess(&view, &mut StrategyMemory::new()).unwrap_err();
    assert_eq!(
        err,
        StrategyError::InsufficientCandidates {
            player_id: 1,
            needed: 3,
            available: 2,
        }
    );
}
