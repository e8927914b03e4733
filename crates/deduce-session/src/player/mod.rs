//! The `Player` capability and its three implementations.

mod builtin;
mod custom;
mod human;

pub use builtin::BuiltInAiPlayer;
pub use custom::CustomAiPlayer;
pub use human::{HumanInbox, HumanInput, HumanPlayer};

use crate::error::PlayerError;
use deduce_bot::Difficulty;
use deduce_core::{KeywordIndex, PlayerId, PlayerView};
use deduce_sandbox::SnippetRejected;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

pub type GuessFut<'a> = Pin<Box<dyn Future<Output = Result<PlayerGuess, PlayerError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerGuess {
    pub indices: Vec<KeywordIndex>,
    /// The guess came from the reveal-aware random fallback.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Human,
    BuiltInAi(Difficulty),
    CustomAi,
}

impl PlayerKind {
    pub fn is_ai(self) -> bool {
        !matches!(self, PlayerKind::Human)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
}

/// Anything that can take a turn. The session awaits `produce_guess` to
/// completion before scoring.
pub trait Player: Send {
    fn info(&self) -> &PlayerInfo;

    fn produce_guess<'a>(&'a mut self, view: &'a PlayerView) -> GuessFut<'a>;

    /// Checked once at session start; an error removes the player.
    fn eligibility(&self) -> Result<(), SnippetRejected> {
        Ok(())
    }

    /// Where externally submitted guesses are delivered, for players that
    /// take them.
    fn inbox(&self) -> Option<HumanInbox> {
        None
    }

    fn reset(&mut self) {}
}
