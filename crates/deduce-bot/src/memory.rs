use crate::strategy::DuplicateResolution;
use deduce_core::KeywordIndex;
use std::collections::{BTreeSet, VecDeque};

const RECENT_WINDOW: usize = 3;

/// Per-session, per-player strategy memory. Owned by the player and passed
/// into every selection; never shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct StrategyMemory {
    own_guesses: Vec<Vec<KeywordIndex>>,
    recent: VecDeque<Vec<KeywordIndex>>,
    fallbacks: u32,
    duplicate_resolutions: u32,
    last_reason: Option<&'static str>,
}

impl StrategyMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        guess: &[KeywordIndex],
        reason: &'static str,
        resolution: DuplicateResolution,
    ) {
        self.own_guesses.push(guess.to_vec());
        self.recent.push_back(guess.to_vec());
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        if resolution != DuplicateResolution::Fresh {
            self.duplicate_resolutions += 1;
        }
        self.last_reason = Some(reason);
    }

    pub(crate) fn note_fallback(&mut self) {
        self.fallbacks += 1;
    }

    pub fn own_guesses(&self) -> &[Vec<KeywordIndex>] {
        &self.own_guesses
    }

    /// Keywords used in the last few own guesses.
    pub fn recent_keywords(&self) -> BTreeSet<KeywordIndex> {
        self.recent.iter().flatten().copied().collect()
    }

    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    pub fn duplicate_resolutions(&self) -> u32 {
        self.duplicate_resolutions
    }

    pub fn last_reason(&self) -> Option<&'static str> {
        self.last_reason
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
