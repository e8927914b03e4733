use super::{GuessFut, Player, PlayerGuess, PlayerInfo, PlayerKind};
use crate::error::PlayerError;
use deduce_core::{KeywordIndex, PlayerId, PlayerView};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanInput {
    Guess(Vec<KeywordIndex>),
    /// The UI countdown ran out.
    Fallback,
}

pub type HumanInbox = mpsc::UnboundedSender<HumanInput>;

/// Waits for guesses that the session forwards from its handle.
#[derive(Debug)]
pub struct HumanPlayer {
    info: PlayerInfo,
    sender: HumanInbox,
    receiver: mpsc::UnboundedReceiver<HumanInput>,
    rng: StdRng,
}

impl HumanPlayer {
    pub fn new(id: PlayerId, name: impl Into<String>, seed: u64) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            info: PlayerInfo {
                id,
                name: name.into(),
                kind: PlayerKind::Human,
            },
            sender,
            receiver,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Player for HumanPlayer {
    fn info(&self) -> &PlayerInfo {
        &self.info
    }

    fn produce_guess<'a>(&'a mut self, view: &'a PlayerView) -> GuessFut<'a> {
        Box::pin(async move {
            match self.receiver.recv().await {
                Some(HumanInput::Guess(indices)) => Ok(PlayerGuess {
                    indices,
                    fallback: false,
                }),
                Some(HumanInput::Fallback) => Ok(PlayerGuess {
                    indices: view.fallback_guess(&mut self.rng),
                    fallback: true,
                }),
                None => Err(PlayerError::InputClosed),
            }
        })
    }

    fn inbox(&self) -> Option<HumanInbox> {
        Some(self.sender.clone())
    }

    /// Drops anything submitted outside a turn.
    fn reset(&mut self) {
        while self.receiver.try_recv().is_ok() {}
    }
}
