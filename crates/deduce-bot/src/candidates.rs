use deduce_core::{KeywordIndex, PlayerView};

/// Keywords a player may still sensibly guess.
///
/// Excludes own hints, revealed wrongs, hints shared by other players and
/// every member of a guess that scored zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    valid: Vec<KeywordIndex>,
    mask: Vec<bool>,
}

impl CandidatePool {
    pub fn from_view(view: &PlayerView) -> Self {
        let mut mask = vec![false; view.keyword_count()];
        for index in view.candidate_indices() {
            mask[index] = true;
        }
        for record in &view.previous_guesses {
            if record.correct_count == 0 {
                for &index in &record.guessed {
                    if let Some(slot) = mask.get_mut(index) {
                        *slot = false;
                    }
                }
            }
        }
        let valid = (0..mask.len()).filter(|&index| mask[index]).collect();
        Self { valid, mask }
    }

    pub fn valid(&self) -> &[KeywordIndex] {
        &self.valid
    }

    pub fn contains(&self, index: KeywordIndex) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Pool members ordered by descending score, lowest index first on ties.
    pub fn ranked(&self, scores: &[f64]) -> Vec<KeywordIndex> {
        let mut ranked = self.valid.clone();
        ranked.sort_by(|&a, &b| score_of(scores, b).total_cmp(&score_of(scores, a)).then(a.cmp(&b)));
        ranked
    }
}

pub(crate) fn score_of(scores: &[f64], index: KeywordIndex) -> f64 {
    scores.get(index).copied().unwrap_or(0.0)
}

/// Calls `visit` with every `k`-subset of `items` in lexicographic order until
/// it returns `false`.
pub(crate) fn for_each_combination<F>(items: &[KeywordIndex], k: usize, mut visit: F)
where
    F: FnMut(&[KeywordIndex]) -> bool,
{
    if k > items.len() {
        return;
    }
    let mut positions: Vec<usize> = (0..k).collect();
    let mut current: Vec<KeywordIndex> = positions.iter().map(|&p| items[p]).collect();
    loop {
        if !visit(&current) {
            return;
        }
        let mut slot = k;
        loop {
            if slot == 0 {
                return;
            }
            slot -= 1;
            if positions[slot] < items.len() - k + slot {
                break;
            }
            if slot == 0 {
                return;
            }
        }
        positions[slot] += 1;
        for next in (slot + 1)..k {
            positions[next] = positions[next - 1] + 1;
        }
        for (offset, &position) in positions.iter().enumerate() {
            current[offset] = items[position];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deduce_core::GuessRecord;
    use std::collections::BTreeSet;

    fn view() -> PlayerView {
        PlayerView {
            player_id: 1,
            keywords: (0..10).map(|i| format!("kw{i}")).collect(),
            answer_count: 3,
            my_hints: BTreeSet::from([0]),
            previous_guesses: vec![
                GuessRecord::new(2, &[2, 3, 5], 0),
                GuessRecord::new(2, &[1, 4, 9], 2),
            ],
            revealed_answers: BTreeSet::new(),
            revealed_wrongs: BTreeSet::from([8]),
            other_hints: BTreeSet::from([6]),
            current_turn: 3,
            max_turns: None,
            time_limit_secs: 60,
        }
    }

    #[test]
    fn pool_drops_known_impossible_keywords() {
        let pool = CandidatePool::from_view(&view());
        assert_eq!(pool.valid(), &[1, 4, 7, 9]);
        assert!(!pool.contains(3));
        assert!(!pool.contains(42));
    }

    #[test]
    fn combinations_are_lexicographic() {
        let mut seen = Vec::new();
        for_each_combination(&[1, 3, 5, 7], 2, |combo| {
            seen.push(combo.to_vec());
            true
        });
        assert_eq!(
            seen,
            vec![
                vec![1, 3],
                vec![1, 5],
                vec![1, 7],
                vec![3, 5],
                vec![3, 7],
                vec![5, 7]
            ]
        );
        let mut count = 0;
        for_each_combination(&[1, 2, 3], 0, |_| {
            count += 1;
            true
        });
        assert_eq!(count, 1);
    }
}
