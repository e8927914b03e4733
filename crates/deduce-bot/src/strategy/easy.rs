use super::TierPick;
use crate::candidates::CandidatePool;
use crate::config::StrategyConfig;
use crate::memory::StrategyMemory;
use deduce_core::{KeywordIndex, PlayerView};
use rand::Rng;
use rand::seq::SliceRandom;

const REVEALED_SHARE: f64 = 0.7;

/// Near-random play. Uses only part of the revealed answers, prefers
/// keywords it has not tried lately, and sometimes slips.
pub(crate) fn pick<R: Rng + ?Sized>(
    view: &PlayerView,
    pool: &CandidatePool,
    memory: &StrategyMemory,
    config: &StrategyConfig,
    rng: &mut R,
) -> TierPick {
    let needed = view.answer_count;
    let recent = memory.recent_keywords();

    let mut revealed: Vec<KeywordIndex> = view
        .revealed_answers
        .iter()
        .copied()
        .filter(|&index| pool.contains(index))
        .collect();
    revealed.shuffle(rng);
    revealed.truncate((needed as f64 * REVEALED_SHARE).floor() as usize);

    let mut guess = revealed.clone();
    let (mut stale, mut fresh): (Vec<KeywordIndex>, Vec<KeywordIndex>) = pool
        .valid()
        .iter()
        .copied()
        .filter(|index| !guess.contains(index))
        .partition(|index| recent.contains(index));
    fresh.shuffle(rng);
    stale.shuffle(rng);
    for index in fresh.into_iter().chain(stale) {
        if guess.len() >= needed {
            break;
        }
        guess.push(index);
    }

    let mut reason = "easy_random";
    if rng.gen_bool(config.easy_error_rate) {
        let unused: Vec<KeywordIndex> = pool
            .valid()
            .iter()
            .copied()
            .filter(|index| !guess.contains(index))
            .collect();
        if let Some(&incoming) = unused.choose(rng) {
            if !guess.is_empty() {
                let slot = rng.gen_range(0..guess.len());
                guess[slot] = incoming;
                reason = "easy_slip";
            }
        }
    }

    let mut scores = vec![0.0; view.keyword_count()];
    for &index in pool.valid() {
        scores[index] = if view.revealed_answers.contains(&index) {
            1.0
        } else if recent.contains(&index) {
            0.25
        } else {
            0.5
        };
    }

    TierPick {
        guess,
        scores,
        reason,
    }
}
