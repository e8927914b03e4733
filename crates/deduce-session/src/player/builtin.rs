use super::{GuessFut, Player, PlayerGuess, PlayerInfo, PlayerKind};
use deduce_bot::{Difficulty, StrategyConfig, StrategyEngine, StrategyMemory};
use deduce_core::{PlayerId, PlayerView};

/// Strategy-engine player with its own per-session memory.
#[derive(Debug)]
pub struct BuiltInAiPlayer {
    info: PlayerInfo,
    engine: StrategyEngine,
    memory: StrategyMemory,
}

impl BuiltInAiPlayer {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        difficulty: Difficulty,
        config: StrategyConfig,
        seed: u64,
    ) -> Self {
        Self {
            info: PlayerInfo {
                id,
                name: name.into(),
                kind: PlayerKind::BuiltInAi(difficulty),
            },
            engine: StrategyEngine::new(difficulty, config, seed),
            memory: StrategyMemory::new(),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.engine.difficulty()
    }

    pub fn memory(&self) -> &StrategyMemory {
        &self.memory
    }
}

impl Player for BuiltInAiPlayer {
    fn info(&self) -> &PlayerInfo {
        &self.info
    }

    fn produce_guess<'a>(&'a mut self, view: &'a PlayerView) -> GuessFut<'a> {
        Box::pin(async move {
            let decision = self.engine.select_guess(view, &mut self.memory)?;
            Ok(PlayerGuess {
                indices: decision.guess,
                fallback: false,
            })
        })
    }

    fn reset(&mut self) {
        self.engine.reset();
        self.memory.clear();
    }
}
