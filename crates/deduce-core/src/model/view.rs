use super::{GuessRecord, KeywordIndex, ModelError, PlayerId, check_guess};
use crate::inference::InferenceContext;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-player, per-turn snapshot of the game. Owned copy; mutating it never
/// reaches the game context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub keywords: Vec<String>,
    pub answer_count: usize,
    pub my_hints: BTreeSet<KeywordIndex>,
    pub previous_guesses: Vec<GuessRecord>,
    pub revealed_answers: BTreeSet<KeywordIndex>,
    pub revealed_wrongs: BTreeSet<KeywordIndex>,
    /// Hints belonging to other players that were shared with this player.
    pub other_hints: BTreeSet<KeywordIndex>,
    pub current_turn: u32,
    pub max_turns: Option<u32>,
    pub time_limit_secs: u32,
}

impl PlayerView {
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    /// Known not to be an answer from this player's perspective.
    pub fn is_excluded(&self, index: KeywordIndex) -> bool {
        self.my_hints.contains(&index)
            || self.revealed_wrongs.contains(&index)
            || self.other_hints.contains(&index)
    }

    pub fn candidate_indices(&self) -> Vec<KeywordIndex> {
        (0..self.keyword_count())
            .filter(|&index| !self.is_excluded(index))
            .collect()
    }

    pub fn turns_remaining(&self) -> Option<u32> {
        self.max_turns
            .map(|max| max.saturating_sub(self.current_turn.saturating_sub(1)))
    }

    pub fn check(&self, indices: &[KeywordIndex]) -> Result<(), ModelError> {
        check_guess(
            indices,
            self.answer_count,
            self.keyword_count(),
            &self.my_hints,
        )
    }

    /// Reveal-aware random guess: revealed answers first, then random
    /// non-excluded keywords, then any keyword that is not an own hint.
    pub fn fallback_guess<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<KeywordIndex> {
        let needed = self.answer_count;
        let mut picks: Vec<KeywordIndex> = self
            .revealed_answers
            .iter()
            .copied()
            .filter(|index| *index < self.keyword_count() && !self.my_hints.contains(index))
            .take(needed)
            .collect();

        let mut open: Vec<KeywordIndex> = self
            .candidate_indices()
            .into_iter()
            .filter(|index| !picks.contains(index))
            .collect();
        open.shuffle(rng);
        for index in open {
            if picks.len() >= needed {
                break;
            }
            picks.push(index);
        }

        if picks.len() < needed {
            let mut rest: Vec<KeywordIndex> = (0..self.keyword_count())
                .filter(|index| !self.my_hints.contains(index) && !picks.contains(index))
                .collect();
            rest.shuffle(rng);
            picks.extend(rest.into_iter().take(needed - picks.len()));
        }

        picks.sort_unstable();
        picks
    }

    pub fn inference_context(&self) -> InferenceContext {
        InferenceContext {
            keyword_count: self.keyword_count(),
            answer_count: self.answer_count,
            own_hints: self.my_hints.clone(),
            other_hints: self.other_hints.clone(),
            revealed_answers: self.revealed_answers.clone(),
            revealed_wrongs: self.revealed_wrongs.clone(),
            history: self.previous_guesses.clone(),
            extra_constraints: Vec::new(),
        }
    }
}
