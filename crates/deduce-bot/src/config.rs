use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineChoice {
    #[default]
    Logical,
    Bayesian,
}

/// Tunables for the strategy tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub easy_error_rate: f64,
    pub medium_window: usize,
    /// Hard tier hands over to the medium heuristic above this many open keywords.
    pub hard_max_candidates: usize,
    pub max_solutions: usize,
    pub solver_timeout_ms: Option<u64>,
    pub verification_max_unresolved: usize,
    pub verification_max_candidates: usize,
    pub duplicate_attempts: usize,
    pub engine: EngineChoice,
    pub cache_enabled: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            easy_error_rate: 0.1,
            medium_window: 5,
            hard_max_candidates: 500,
            max_solutions: 1_000,
            solver_timeout_ms: Some(250),
            verification_max_unresolved: 3,
            verification_max_candidates: 15,
            duplicate_attempts: 10,
            engine: EngineChoice::Logical,
            cache_enabled: true,
        }
    }
}

impl StrategyConfig {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = read("DEDUCE_CACHE") {
            self.cache_enabled = !matches!(raw.trim(), "0" | "false" | "FALSE" | "off" | "OFF");
        }
        if let Some(raw) = read("DEDUCE_SOLVER_TIMEOUT_MS") {
            match raw.trim() {
                "none" | "off" => self.solver_timeout_ms = None,
                value => {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.solver_timeout_ms = Some(ms);
                    }
                }
            }
        }
        if let Some(raw) = read("DEDUCE_ENGINE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "logical" | "csp" => self.engine = EngineChoice::Logical,
                "bayesian" | "probabilistic" => self.engine = EngineChoice::Bayesian,
                _ => {}
            }
        }
        self
    }

    /// Clamps values into the ranges the tiers rely on.
    pub fn sanitized(mut self) -> Self {
        if !self.easy_error_rate.is_finite() {
            self.easy_error_rate = 0.0;
        }
        self.easy_error_rate = self.easy_error_rate.clamp(0.0, 1.0);
        self.medium_window = self.medium_window.max(1);
        self.max_solutions = self.max_solutions.max(1);
        self.duplicate_attempts = self.duplicate_attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse_env_style_values() {
        let config = StrategyConfig::default().with_overrides(|key| match key {
            "DEDUCE_CACHE" => Some("off".into()),
            "DEDUCE_SOLVER_TIMEOUT_MS" => Some("40".into()),
            "DEDUCE_ENGINE" => Some("Bayesian".into()),
            _ => None,
        });
        assert!(!config.cache_enabled);
        assert_eq!(config.solver_timeout_ms, Some(40));
        assert_eq!(config.engine, EngineChoice::Bayesian);
    }

    #[test]
    fn sanitized_clamps_rates() {
        let config = StrategyConfig {
            easy_error_rate: 3.0,
            medium_window: 0,
            ..StrategyConfig::default()
        }
        .sanitized();
        assert_eq!(config.easy_error_rate, 1.0);
        assert_eq!(config.medium_window, 1);
    }
}
