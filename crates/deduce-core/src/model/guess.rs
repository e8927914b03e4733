use super::{KeywordIndex, ModelError, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One scored guess in the append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuessRecord {
    pub player_id: PlayerId,
    pub guessed: Vec<KeywordIndex>,
    pub correct_count: usize,
}

impl GuessRecord {
    pub fn new(player_id: PlayerId, guessed: &[KeywordIndex], correct_count: usize) -> Self {
        Self {
            player_id,
            guessed: canonical_guess(guessed),
            correct_count,
        }
    }

    pub fn contains(&self, index: KeywordIndex) -> bool {
        self.guessed.binary_search(&index).is_ok()
    }

    /// True when `indices` names the same unordered set as this guess.
    pub fn matches(&self, indices: &[KeywordIndex]) -> bool {
        canonical_guess(indices) == self.guessed
    }
}

/// Sorted, de-duplicated form used as the unordered identity of a guess.
pub fn canonical_guess(indices: &[KeywordIndex]) -> Vec<KeywordIndex> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Checks shape constraints every submitted guess must satisfy.
pub fn check_guess(
    indices: &[KeywordIndex],
    answer_count: usize,
    keyword_count: usize,
    own_hints: &BTreeSet<KeywordIndex>,
) -> Result<(), ModelError> {
    let distinct = canonical_guess(indices);
    if distinct.len() != answer_count || indices.len() != answer_count {
        let actual = if distinct.len() != answer_count {
            distinct.len()
        } else {
            indices.len()
        };
        return Err(ModelError::GuessSize {
            expected: answer_count,
            actual,
        });
    }
    for &index in &distinct {
        if index >= keyword_count {
            return Err(ModelError::IndexOutOfRange {
                index,
                keyword_count,
            });
        }
        if own_hints.contains(&index) {
            return Err(ModelError::GuessContainsHint(index));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_unordered() {
        let record = GuessRecord::new(1, &[7, 1, 4], 2);
        assert_eq!(record.guessed, vec![1, 4, 7]);
        assert!(record.matches(&[4, 7, 1]));
        assert!(!record.matches(&[4, 7]));
        assert!(record.contains(7));
    }

    #[test]
    fn check_guess_rejects_duplicates_and_hints() {
        let hints: BTreeSet<usize> = [3].into_iter().collect();
        assert!(check_guess(&[0, 1, 2], 3, 10, &hints).is_ok());
        assert_eq!(
            check_guess(&[0, 0, 1], 3, 10, &hints),
            Err(ModelError::GuessSize {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            check_guess(&[0, 3, 1], 3, 10, &hints),
            Err(ModelError::GuessContainsHint(3))
        );
        assert!(matches!(
            check_guess(&[0, 1, 10], 3, 10, &hints),
            Err(ModelError::IndexOutOfRange { index: 10, .. })
        ));
    }
}
