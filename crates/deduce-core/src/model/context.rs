use super::{GuessRecord, KeywordIndex, KeywordPool, ModelError, PlayerId, PlayerView};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};

/// Authoritative state of one game. Only the session orchestrator mutates it.
#[derive(Debug, Clone)]
pub struct GameContext {
    keywords: KeywordPool,
    answers: BTreeSet<KeywordIndex>,
    hints: BTreeMap<PlayerId, BTreeSet<KeywordIndex>>,
    current_turn: u32,
    max_turns: Option<u32>,
    time_limit_secs: u32,
    history: Vec<GuessRecord>,
    revealed_answers: BTreeSet<KeywordIndex>,
    revealed_wrongs: BTreeSet<KeywordIndex>,
    shared_hints: BTreeMap<PlayerId, BTreeSet<KeywordIndex>>,
}

impl GameContext {
    pub fn new(
        keywords: KeywordPool,
        answers: &[KeywordIndex],
        hints: BTreeMap<PlayerId, Vec<KeywordIndex>>,
        max_turns: Option<u32>,
        time_limit_secs: u32,
    ) -> Result<Self, ModelError> {
        let keyword_count = keywords.len();
        let answer_set: BTreeSet<KeywordIndex> = answers.iter().copied().collect();
        if answer_set.len() != answers.len() {
            return Err(ModelError::AnswerSetSize {
                expected: answers.len(),
                actual: answer_set.len(),
            });
        }
        if answer_set.is_empty() || answer_set.len() >= keyword_count {
            return Err(ModelError::InvalidAnswerCount {
                answer_count: answer_set.len(),
                keyword_count,
            });
        }
        for &index in &answer_set {
            keywords.check_index(index)?;
        }

        let mut hint_sets = BTreeMap::new();
        for (player_id, indices) in hints {
            let mut set = BTreeSet::new();
            for index in indices {
                keywords.check_index(index)?;
                if answer_set.contains(&index) {
                    return Err(ModelError::HintIsAnswer { player_id, index });
                }
                set.insert(index);
            }
            hint_sets.insert(player_id, set);
        }

        Ok(Self {
            keywords,
            answers: answer_set,
            hints: hint_sets,
            current_turn: 1,
            max_turns,
            time_limit_secs,
            history: Vec::new(),
            revealed_answers: BTreeSet::new(),
            revealed_wrongs: BTreeSet::new(),
            shared_hints: BTreeMap::new(),
        })
    }

    pub fn keywords(&self) -> &KeywordPool {
        &self.keywords
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    pub fn answers(&self) -> &BTreeSet<KeywordIndex> {
        &self.answers
    }

    pub fn hints_for(&self, player_id: PlayerId) -> BTreeSet<KeywordIndex> {
        self.hints.get(&player_id).cloned().unwrap_or_default()
    }

    pub fn hint_owners(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.hints.keys().copied()
    }

    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    pub fn max_turns(&self) -> Option<u32> {
        self.max_turns
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    pub fn history(&self) -> &[GuessRecord] {
        &self.history
    }

    pub fn revealed_answers(&self) -> &BTreeSet<KeywordIndex> {
        &self.revealed_answers
    }

    pub fn revealed_wrongs(&self) -> &BTreeSet<KeywordIndex> {
        &self.revealed_wrongs
    }

    pub fn shared_hint_count(&self, player_id: PlayerId) -> usize {
        self.shared_hints.get(&player_id).map_or(0, BTreeSet::len)
    }

    /// Size of the intersection between `guess` and the hidden answer set.
    pub fn score(&self, guess: &[KeywordIndex]) -> usize {
        super::canonical_guess(guess)
            .iter()
            .filter(|index| self.answers.contains(index))
            .count()
    }

    /// Scores `guess` and appends it to the history.
    pub fn record_guess(&mut self, player_id: PlayerId, guess: &[KeywordIndex]) -> GuessRecord {
        let record = GuessRecord::new(player_id, guess, self.score(guess));
        self.history.push(record.clone());
        record
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_turns
            .is_some_and(|max_turns| self.current_turn >= max_turns)
    }

    pub fn advance_turn(&mut self) {
        self.current_turn += 1;
    }

    /// Reveals one not-yet-revealed answer, chosen uniformly.
    pub fn reveal_answer<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<KeywordIndex> {
        let hidden: Vec<KeywordIndex> = self
            .answers
            .difference(&self.revealed_answers)
            .copied()
            .collect();
        let chosen = *hidden.choose(rng)?;
        self.revealed_answers.insert(chosen);
        Some(chosen)
    }

    /// Reveals one not-yet-revealed non-answer, chosen uniformly.
    pub fn reveal_wrong<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<KeywordIndex> {
        let hidden: Vec<KeywordIndex> = (0..self.keyword_count())
            .filter(|index| !self.answers.contains(index) && !self.revealed_wrongs.contains(index))
            .collect();
        let chosen = *hidden.choose(rng)?;
        self.revealed_wrongs.insert(chosen);
        Some(chosen)
    }

    /// Shares one hint owned by another player with `player_id`.
    pub fn share_hint_with<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        rng: &mut R,
    ) -> Option<(PlayerId, KeywordIndex)> {
        let own = self.hints_for(player_id);
        let known = self.shared_hints.get(&player_id);
        let mut options: Vec<(PlayerId, KeywordIndex)> = Vec::new();
        for (&owner, indices) in &self.hints {
            if owner == player_id {
                continue;
            }
            for &index in indices {
                let already = known.is_some_and(|set| set.contains(&index));
                if !already && !own.contains(&index) && !options.iter().any(|(_, i)| *i == index)
                {
                    options.push((owner, index));
                }
            }
        }
        let chosen = *options.choose(rng)?;
        self.shared_hints
            .entry(player_id)
            .or_default()
            .insert(chosen.1);
        Some(chosen)
    }

    /// Read-only snapshot of what `player_id` is allowed to see.
    pub fn view_for(&self, player_id: PlayerId) -> PlayerView {
        PlayerView {
            player_id,
            keywords: self.keywords.words().to_vec(),
            answer_count: self.answer_count(),
            my_hints: self.hints_for(player_id),
            previous_guesses: self.history.clone(),
            revealed_answers: self.revealed_answers.clone(),
            revealed_wrongs: self.revealed_wrongs.clone(),
            other_hints: self
                .shared_hints
                .get(&player_id)
                .cloned()
                .unwrap_or_default(),
            current_turn: self.current_turn,
            max_turns: self.max_turns,
            time_limit_secs: self.time_limit_secs,
        }
    }
}
