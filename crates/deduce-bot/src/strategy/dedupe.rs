use crate::candidates::score_of;
use deduce_core::model::canonical_guess;
use deduce_core::{GuessRecord, KeywordIndex};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateResolution {
    Fresh,
    Substituted { replaced: usize },
    Resampled { attempt: usize },
    Repeated,
}

/// Steers `guess` away from any unordered set already in `history`.
///
/// Order of attempts: swap out the lowest-scoring members for the best
/// unused candidates, then up to `attempts` random draws from the top of the
/// pool, then give up and keep the original.
pub(crate) fn avoid_duplicates<R: Rng + ?Sized>(
    guess: &[KeywordIndex],
    scores: &[f64],
    pool: &[KeywordIndex],
    history: &[GuessRecord],
    attempts: usize,
    rng: &mut R,
) -> (Vec<KeywordIndex>, DuplicateResolution) {
    let seen: HashSet<Vec<KeywordIndex>> =
        history.iter().map(|record| record.guessed.clone()).collect();
    let original = canonical_guess(guess);
    if !seen.contains(&original) {
        return (original, DuplicateResolution::Fresh);
    }

    let mut lowest = original.clone();
    lowest.sort_by(|&a, &b| {
        score_of(scores, a)
            .total_cmp(&score_of(scores, b))
            .then(b.cmp(&a))
    });
    let mut alternatives: Vec<KeywordIndex> = pool
        .iter()
        .copied()
        .filter(|index| !original.contains(index))
        .collect();
    alternatives.sort_by(|&a, &b| {
        score_of(scores, b)
            .total_cmp(&score_of(scores, a))
            .then(a.cmp(&b))
    });

    for replaced in 1..=lowest.len().min(alternatives.len()) {
        let mut candidate: Vec<KeywordIndex> = lowest[replaced..].to_vec();
        candidate.extend_from_slice(&alternatives[..replaced]);
        let candidate = canonical_guess(&candidate);
        if !seen.contains(&candidate) {
            return (candidate, DuplicateResolution::Substituted { replaced });
        }
    }
    for &outgoing in &lowest {
        for &incoming in &alternatives {
            let swapped: Vec<KeywordIndex> = original
                .iter()
                .map(|&index| if index == outgoing { incoming } else { index })
                .collect();
            let swapped = canonical_guess(&swapped);
            if !seen.contains(&swapped) {
                return (swapped, DuplicateResolution::Substituted { replaced: 1 });
            }
        }
    }

    let needed = original.len();
    let mut ranked: Vec<KeywordIndex> = pool.to_vec();
    ranked.sort_by(|&a, &b| {
        score_of(scores, b)
            .total_cmp(&score_of(scores, a))
            .then(a.cmp(&b))
    });
    ranked.truncate(needed * 2);
    if ranked.len() >= needed {
        for attempt in 1..=attempts {
            ranked.shuffle(rng);
            let candidate = canonical_guess(&ranked[..needed]);
            if !seen.contains(&candidate) {
                return (candidate, DuplicateResolution::Resampled { attempt });
            }
        }
    }

    (original, DuplicateResolution::Repeated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fresh_guesses_pass_through() {
        let mut rng = StdRng::seed_from_u64(1);
        let (guess, resolution) =
            avoid_duplicates(&[3, 1, 2], &[], &[1, 2, 3, 4], &[], 10, &mut rng);
        assert_eq!(guess, vec![1, 2, 3]);
        assert_eq!(resolution, DuplicateResolution::Fresh);
    }

    #[test]
    fn substitutes_lowest_scoring_member() {
        let mut rng = StdRng::seed_from_u64(1);
        let scores = [0.0, 0.9, 0.8, 0.1, 0.7, 0.2];
        let history = vec![GuessRecord::new(2, &[1, 2, 3], 1)];
        let (guess, resolution) =
            avoid_duplicates(&[1, 2, 3], &scores, &[1, 2, 3, 4, 5], &history, 10, &mut rng);
        assert_eq!(guess, vec![1, 2, 4]);
        assert_eq!(resolution, DuplicateResolution::Substituted { replaced: 1 });
    }

    #[test]
    fn single_swaps_cover_blocked_block_substitutions() {
        let mut rng = StdRng::seed_from_u64(1);
        let scores = [0.0, 0.9, 0.8, 0.1, 0.7];
        let history = vec![
            GuessRecord::new(2, &[1, 2, 3], 1),
            GuessRecord::new(2, &[1, 2, 4], 1),
        ];
        let (guess, resolution) =
            avoid_duplicates(&[1, 2, 3], &scores, &[1, 2, 3, 4], &history, 10, &mut rng);
        assert_eq!(guess, vec![1, 3, 4]);
        assert_eq!(resolution, DuplicateResolution::Substituted { replaced: 1 });
    }

    #[test]
    fn accepts_repeat_when_nothing_else_exists() {
        let mut rng = StdRng::seed_from_u64(1);
        let history = vec![GuessRecord::new(2, &[1, 2], 1)];
        let (guess, resolution) = avoid_duplicates(&[2, 1], &[], &[1, 2], &history, 10, &mut rng);
        assert_eq!(guess, vec![1, 2]);
        assert_eq!(resolution, DuplicateResolution::Repeated);
    }
}
