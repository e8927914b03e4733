pub mod cache;
pub mod inference;
pub mod model;

pub use cache::{CacheKey, CacheStats, MemoCache, Memoized, PoolSettings};
pub use inference::{
    Constraint, ConstraintKind, EngineKind, InferenceContext, InferenceEngine, InferenceResult,
    LogicalInference, ProbabilisticInference, Truncation,
};
pub use model::{
    GameContext, GuessRecord, KeywordIndex, KeywordPool, ModelError, PlayerId, PlayerView,
};
