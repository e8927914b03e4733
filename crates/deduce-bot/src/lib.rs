mod candidates;
mod config;
mod difficulty;
mod memory;
pub mod strategy;

pub use candidates::CandidatePool;
pub use config::{EngineChoice, StrategyConfig};
pub use difficulty::{Difficulty, ParseDifficultyError};
pub use memory::StrategyMemory;
pub use strategy::{
    Decision, DuplicateResolution, GamePhase, StrategicRecommendation, StrategyEngine,
    StrategyError,
};
