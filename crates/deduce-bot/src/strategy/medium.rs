use super::TierPick;
use crate::candidates::CandidatePool;
use crate::config::StrategyConfig;
use deduce_core::{GuessRecord, KeywordIndex, PlayerView};

const UNSEEN_SCORE: f64 = 0.3;
const INTERSECTION_WEIGHT: f64 = 0.5;
const PINNED_BONUS: f64 = 5.0;
const REVEALED_BONUS: f64 = 10.0;

/// Success-rate scoring over a short window of recent guesses, with a bonus
/// for keywords shared by pairs of scoring guesses.
pub(crate) fn pick(view: &PlayerView, pool: &CandidatePool, config: &StrategyConfig) -> TierPick {
    let needed = view.answer_count;
    let history = &view.previous_guesses;
    let window: &[GuessRecord] = &history[history.len().saturating_sub(config.medium_window)..];

    let mut scores = vec![0.0; view.keyword_count()];
    let mut seen = vec![false; view.keyword_count()];
    let mut pinned_wrong = vec![false; view.keyword_count()];

    for record in window {
        let rate = record.correct_count as f64 / record.guessed.len().max(1) as f64;
        for &index in &record.guessed {
            if pool.contains(index) {
                scores[index] += rate;
                seen[index] = true;
            }
        }
    }

    for (offset, first) in window.iter().enumerate() {
        for second in &window[offset + 1..] {
            if first.correct_count > 0 && second.correct_count > 0 {
                let bonus = INTERSECTION_WEIGHT * first.correct_count.min(second.correct_count) as f64
                    / needed.max(1) as f64;
                for &index in &first.guessed {
                    if second.contains(index) && pool.contains(index) {
                        scores[index] += bonus;
                    }
                }
            }

            let only_first: Vec<KeywordIndex> = first
                .guessed
                .iter()
                .copied()
                .filter(|&k| !second.contains(k))
                .collect();
            let only_second: Vec<KeywordIndex> = second
                .guessed
                .iter()
                .copied()
                .filter(|&k| !first.contains(k))
                .collect();
            if let ([x], [y]) = (only_first.as_slice(), only_second.as_slice()) {
                let (answer, wrong) = match second.correct_count as i64 - first.correct_count as i64 {
                    1 => (*y, *x),
                    -1 => (*x, *y),
                    _ => continue,
                };
                if pool.contains(answer) {
                    scores[answer] += PINNED_BONUS;
                }
                pinned_wrong[wrong] = true;
            }
        }
    }

    for &index in pool.valid() {
        if !seen[index] {
            scores[index] = UNSEEN_SCORE;
        }
        if view.revealed_answers.contains(&index) {
            scores[index] += REVEALED_BONUS;
        }
    }

    let ranked = pool.ranked(&scores);
    let mut guess: Vec<KeywordIndex> = ranked
        .iter()
        .copied()
        .filter(|&index| !pinned_wrong[index])
        .take(needed)
        .collect();
    for &index in &ranked {
        if guess.len() >= needed {
            break;
        }
        if !guess.contains(&index) {
            guess.push(index);
        }
    }
    for (index, wrong) in pinned_wrong.iter().enumerate() {
        if *wrong {
            scores[index] = f64::NEG_INFINITY;
        }
    }

    TierPick {
        guess,
        scores,
        reason: "medium_window",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn view(history: Vec<GuessRecord>) -> PlayerView {
        PlayerView {
            player_id: 1,
            keywords: (0..10).map(|i| format!("kw{i}")).collect(),
            answer_count: 3,
            my_hints: BTreeSet::new(),
            previous_guesses: history,
            revealed_answers: BTreeSet::new(),
            revealed_wrongs: BTreeSet::new(),
            other_hints: BTreeSet::new(),
            current_turn: 4,
            max_turns: None,
            time_limit_secs: 60,
        }
    }

    #[test]
    fn shared_members_of_scoring_guesses_rank_first() {
        let view = view(vec![
            GuessRecord::new(2, &[1, 4, 9], 2),
            GuessRecord::new(2, &[2, 4, 7], 2),
        ]);
        let pool = CandidatePool::from_view(&view);
        let pick = pick(&view, &pool, &StrategyConfig::default());
        assert!(pick.guess.contains(&4));
        assert!(pick.scores[4] > pick.scores[1]);
    }

    #[test]
    fn single_swap_pins_steer_the_pick() {
        let view = view(vec![
            GuessRecord::new(2, &[0, 1, 2], 1),
            GuessRecord::new(2, &[0, 1, 3], 2),
        ]);
        let pool = CandidatePool::from_view(&view);
        let pick = pick(&view, &pool, &StrategyConfig::default());
        assert!(pick.guess.contains(&3));
        assert!(!pick.guess.contains(&2));
    }

    #[test]
    fn window_ignores_old_guesses() {
        let mut history = vec![GuessRecord::new(2, &[7, 8, 9], 3)];
        for _ in 0..5 {
            history.push(GuessRecord::new(2, &[0, 1, 2], 1));
        }
        let view = view(history);
        let pool = CandidatePool::from_view(&view);
        let pick = pick(&view, &pool, &StrategyConfig::default());
        assert_eq!(pick.scores[7], UNSEEN_SCORE);
    }
}
