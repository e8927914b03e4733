use deduce_core::PlayerId;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

pub const DEFAULT_HISTORY: usize = 1_000;
const RECENT_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionMetrics {
    pub player_id: PlayerId,
    pub elapsed: Duration,
    pub error_kind: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    pub executions: usize,
    pub success_rate: f64,
    pub average_ms: f64,
    pub max_ms: f64,
    pub recent_errors: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub executions: usize,
    pub success_rate: f64,
    pub average_ms: f64,
    pub peak_ms: f64,
    pub active_players: usize,
}

/// Bounded record of sandbox runs; the oldest entries fall off first.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    history: VecDeque<ExecutionMetrics>,
    capacity: usize,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl PerformanceMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, metrics: ExecutionMetrics) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(metrics);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn player_stats(&self, player_id: PlayerId) -> PlayerStats {
        let runs: Vec<&ExecutionMetrics> = self
            .history
            .iter()
            .filter(|metrics| metrics.player_id == player_id)
            .collect();
        if runs.is_empty() {
            return PlayerStats::default();
        }
        let (average_ms, max_ms) = timing(runs.iter().copied());
        let mut recent_errors: Vec<&'static str> =
            runs.iter().rev().filter_map(|m| m.error_kind).take(RECENT_ERRORS).collect();
        recent_errors.reverse();
        PlayerStats {
            executions: runs.len(),
            success_rate: success_rate(runs.iter().copied()),
            average_ms,
            max_ms,
            recent_errors,
        }
    }

    pub fn global_stats(&self) -> GlobalStats {
        if self.history.is_empty() {
            return GlobalStats::default();
        }
        let (average_ms, peak_ms) = timing(self.history.iter());
        let players: BTreeSet<PlayerId> = self.history.iter().map(|m| m.player_id).collect();
        GlobalStats {
            executions: self.history.len(),
            success_rate: success_rate(self.history.iter()),
            average_ms,
            peak_ms,
            active_players: players.len(),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_micros() as f64 / 1_000.0
}

fn timing<'a, I>(runs: I) -> (f64, f64)
where
    I: Iterator<Item = &'a ExecutionMetrics>,
{
    let mut total = 0.0;
    let mut peak: f64 = 0.0;
    let mut count = 0usize;
    for metrics in runs {
        let ms = millis(metrics.elapsed);
        total += ms;
        peak = peak.max(ms);
        count += 1;
    }
    (total / count.max(1) as f64, peak)
}

fn success_rate<'a, I>(runs: I) -> f64
where
    I: Iterator<Item = &'a ExecutionMetrics>,
{
    let (ok, total) = runs.fold((0usize, 0usize), |(ok, total), metrics| {
        (ok + usize::from(metrics.error_kind.is_none()), total + 1)
    });
    ok as f64 / total.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(player_id: PlayerId, ms: u64, error_kind: Option<&'static str>) -> ExecutionMetrics {
        ExecutionMetrics {
            player_id,
            elapsed: Duration::from_millis(ms),
            error_kind,
        }
    }

    #[test]
    fn history_is_bounded() {
        let mut monitor = PerformanceMonitor::new(3);
        for ms in 0..5 {
            monitor.record(run(1, ms, None));
        }
        assert_eq!(monitor.len(), 3);
        assert_eq!(monitor.player_stats(1).max_ms, 4.0);
    }

    #[test]
    fn player_stats_track_errors() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record(run(1, 10, None));
        monitor.record(run(1, 30, Some("timeout")));
        monitor.record(run(2, 50, Some("runtime")));
        let stats = monitor.player_stats(1);
        assert_eq!(stats.executions, 2);
        assert_eq!(stats.success_rate, 0.5);
        assert_eq!(stats.average_ms, 20.0);
        assert_eq!(stats.recent_errors, vec!["timeout"]);

        let global = monitor.global_stats();
        assert_eq!(global.executions, 3);
        assert_eq!(global.active_players, 2);
        assert_eq!(global.peak_ms, 50.0);
        assert_eq!(monitor.player_stats(9), PlayerStats::default());
    }
}
