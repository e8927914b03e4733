use deduce_bot::StrategyError;
use deduce_core::{ModelError, PlayerId};
use thiserror::Error;

/// Fatal problems found before the first turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("need at least {required} eligible players, have {available}")]
    InsufficientPlayers { required: usize, available: usize },
    #[error("player id {0} is used twice")]
    DuplicatePlayerId(PlayerId),
    #[error("hints assigned to unknown player {0}")]
    UnknownHintOwner(PlayerId),
    #[error("player {player_id} has {available} guessable keywords, needs {needed}")]
    InsufficientCandidates {
        player_id: PlayerId,
        needed: usize,
        available: usize,
    },
    #[error("session was already started")]
    AlreadyStarted,
    #[error(transparent)]
    InvalidGame(#[from] ModelError),
}

/// Rejections of calls made through a [`crate::SessionHandle`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("it is not a human player's turn")]
    NotHumanTurn,
    #[error("invalid guess: {0}")]
    InvalidHumanGuess(ModelError),
    #[error("no session is running")]
    NotRunning,
    #[error("session has shut down")]
    Closed,
}

/// A player failed to produce a guess this turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("player input channel closed")]
    InputClosed,
}
