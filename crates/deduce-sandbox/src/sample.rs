use deduce_core::{GuessRecord, PlayerView};
use std::collections::BTreeSet;

const SAMPLE_KEYWORDS: [&str; 10] = [
    "apple", "banana", "cherry", "grape", "lemon", "mango", "orange", "peach", "plum", "melon",
];

/// A small mid-game position for trying snippets outside a session.
pub fn sample_view() -> PlayerView {
    PlayerView {
        player_id: 1,
        keywords: SAMPLE_KEYWORDS.iter().map(|word| word.to_string()).collect(),
        answer_count: 3,
        my_hints: BTreeSet::from([1, 3]),
        previous_guesses: vec![
            GuessRecord::new(1, &[0, 2, 4], 2),
            GuessRecord::new(2, &[2, 5, 6], 1),
        ],
        revealed_answers: BTreeSet::new(),
        revealed_wrongs: BTreeSet::from([7]),
        other_hints: BTreeSet::new(),
        current_turn: 3,
        max_turns: Some(20),
        time_limit_secs: 60,
    }
}
