use super::{GuessFut, Player, PlayerGuess, PlayerInfo, PlayerKind};
use deduce_core::{PlayerId, PlayerView};
use deduce_sandbox::{SandboxExecutor, SnippetRejected};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Runs a player-supplied snippet through the sandbox every turn.
#[derive(Debug)]
pub struct CustomAiPlayer {
    info: PlayerInfo,
    code: String,
    executor: Arc<SandboxExecutor>,
    rng: StdRng,
}

impl CustomAiPlayer {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        code: impl Into<String>,
        executor: Arc<SandboxExecutor>,
        seed: u64,
    ) -> Self {
        Self {
            info: PlayerInfo {
                id,
                name: name.into(),
                kind: PlayerKind::CustomAi,
            },
            code: code.into(),
            executor,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Player for CustomAiPlayer {
    fn info(&self) -> &PlayerInfo {
        &self.info
    }

    fn produce_guess<'a>(&'a mut self, view: &'a PlayerView) -> GuessFut<'a> {
        Box::pin(async move {
            let outcome = self
                .executor
                .execute_with_fallback(self.info.id, &self.code, view, &mut self.rng)
                .await;
            Ok(PlayerGuess {
                indices: outcome.guess,
                fallback: outcome.fallback,
            })
        })
    }

    fn eligibility(&self) -> Result<(), SnippetRejected> {
        self.executor.validate(&self.code).map(|_| ())
    }
}
