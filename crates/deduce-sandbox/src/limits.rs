use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource bounds applied to every custom snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    pub timeout_ms: u64,
    pub max_code_length: usize,
    pub max_lines: usize,
    /// Interpreter operation budget; `0` leaves only the wall clock.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub complexity_warning: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 2_500,
            max_code_length: 10_000,
            max_lines: 500,
            max_operations: 5_000_000,
            max_call_levels: 64,
            max_string_size: 64 * 1024,
            max_array_size: 10_000,
            complexity_warning: 100,
        }
    }
}

impl SandboxLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
