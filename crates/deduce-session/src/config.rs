use deduce_bot::StrategyConfig;
use deduce_sandbox::SandboxLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-session settings. Every field has a default, so a partial YAML or JSON
/// block deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_turns: Option<u32>,
    pub time_limit_secs: u32,
    pub min_players: usize,
    /// Pacing floor for AI turns.
    pub min_thinking_ms: u64,
    pub thinking_jitter_ms: u64,
    pub seed: Option<u64>,
    /// Lets built-in AI players learn other players' hints over time.
    pub reveal_other_hints: bool,
    pub strategy: StrategyConfig,
    pub sandbox: SandboxLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: Some(30),
            time_limit_secs: 60,
            min_players: 1,
            min_thinking_ms: 0,
            thinking_jitter_ms: 0,
            seed: None,
            reveal_other_hints: true,
            strategy: StrategyConfig::default(),
            sandbox: SandboxLimits::default(),
        }
    }
}

impl SessionConfig {
    pub fn min_thinking(&self) -> Duration {
        Duration::from_millis(self.min_thinking_ms)
    }
}
