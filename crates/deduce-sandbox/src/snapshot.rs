use deduce_core::PlayerView;
use rhai::{Array, Dynamic, Map};

fn index_array<'a, I>(indices: I) -> Dynamic
where
    I: IntoIterator<Item = &'a usize>,
{
    let array: Array = indices
        .into_iter()
        .map(|&index| Dynamic::from(index as i64))
        .collect();
    Dynamic::from_array(array)
}

/// Builds the script-side `state` map. Every call produces a fresh copy, so
/// a script can only ever mutate its own values.
pub(crate) fn state_map(view: &PlayerView) -> Dynamic {
    let mut state = Map::new();
    let keywords: Array = view
        .keywords
        .iter()
        .map(|word| Dynamic::from(word.clone()))
        .collect();
    state.insert("keywords".into(), Dynamic::from_array(keywords));
    state.insert("my_hints".into(), index_array(&view.my_hints));
    state.insert("answer_count".into(), Dynamic::from(view.answer_count as i64));

    let guesses: Array = view
        .previous_guesses
        .iter()
        .map(|record| {
            let mut entry = Map::new();
            entry.insert("player_id".into(), Dynamic::from(i64::from(record.player_id)));
            entry.insert("guess".into(), index_array(&record.guessed));
            entry.insert(
                "correct_count".into(),
                Dynamic::from(record.correct_count as i64),
            );
            Dynamic::from_map(entry)
        })
        .collect();
    state.insert("previous_guesses".into(), Dynamic::from_array(guesses));
    state.insert("revealed_answers".into(), index_array(&view.revealed_answers));
    state.insert("revealed_wrongs".into(), index_array(&view.revealed_wrongs));
    state.insert("current_turn".into(), Dynamic::from(i64::from(view.current_turn)));
    state.insert(
        "max_turns".into(),
        view.max_turns
            .map_or(Dynamic::UNIT, |max| Dynamic::from(i64::from(max))),
    );
    state.insert("time_limit".into(), Dynamic::from(i64::from(view.time_limit_secs)));
    Dynamic::from_map(state)
}
