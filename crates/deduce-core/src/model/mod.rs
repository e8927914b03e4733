mod context;
mod guess;
mod keyword;
mod view;

pub use context::GameContext;
pub use guess::{GuessRecord, canonical_guess, check_guess};
pub use keyword::{KeywordIndex, KeywordPool};
pub use view::PlayerView;

use thiserror::Error;

pub type PlayerId = u32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("keyword pool is empty")]
    EmptyPool,
    #[error("keyword '{0}' appears more than once in the pool")]
    DuplicateKeyword(String),
    #[error("answer count {answer_count} is invalid for a pool of {keyword_count} keywords")]
    InvalidAnswerCount {
        answer_count: usize,
        keyword_count: usize,
    },
    #[error("index {index} is outside the keyword pool of {keyword_count}")]
    IndexOutOfRange { index: usize, keyword_count: usize },
    #[error("answer set contains {actual} distinct indices, expected {expected}")]
    AnswerSetSize { expected: usize, actual: usize },
    #[error("hint {index} for player {player_id} is one of the answers")]
    HintIsAnswer { player_id: PlayerId, index: usize },
    #[error("guess must contain {expected} distinct indices, got {actual}")]
    GuessSize { expected: usize, actual: usize },
    #[error("guess contains the player's own hint {0}")]
    GuessContainsHint(usize),
}
