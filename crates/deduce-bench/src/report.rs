use std::collections::HashMap;
use std::fs;
use std::path::Path;

use deduce_core::PlayerId;
use deduce_sandbox::GlobalStats;
use deduce_session::{FinalState, OutcomeRecord, SessionEvent, TurnRecord};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::AgentKind;

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("turn recorded for unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Agent identity as seen by the report.
#[derive(Debug, Clone)]
pub struct AgentEntry {
    pub id: PlayerId,
    pub name: String,
    pub kind: AgentKind,
    pub label: String,
}

/// Folds finished games into per-agent tallies.
pub struct ReportCollector {
    agents: Vec<AgentTally>,
    by_id: HashMap<PlayerId, usize>,
    answer_count: usize,
    games: usize,
    exhausted: usize,
    stopped: usize,
    turns: Vec<f64>,
}

impl ReportCollector {
    pub fn new(entries: &[AgentEntry], answer_count: usize) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.id, slot))
            .collect();
        Self {
            agents: entries.iter().cloned().map(AgentTally::new).collect(),
            by_id,
            answer_count,
            games: 0,
            exhausted: 0,
            stopped: 0,
            turns: Vec::new(),
        }
    }

    pub fn record_game(
        &mut self,
        outcome: &OutcomeRecord,
        turns: &[TurnRecord],
        events: &[SessionEvent],
    ) -> Result<(), ReportError> {
        self.games += 1;
        self.turns.push(f64::from(outcome.turns_played));
        match outcome.state {
            FinalState::Won { .. } => {}
            FinalState::Exhausted => self.exhausted += 1,
            FinalState::Stopped => self.stopped += 1,
        }

        let mut disqualified = Vec::new();
        for event in events {
            if let SessionEvent::PlayerDisqualified { player_id, .. } = event {
                disqualified.push(*player_id);
            }
        }

        for tally in &mut self.agents {
            if disqualified.contains(&tally.entry.id) {
                tally.disqualified += 1;
            } else {
                tally.games += 1;
            }
        }

        let mut own_turns: HashMap<PlayerId, u32> = HashMap::new();
        for record in turns {
            let slot = self.slot(record.player_id)?;
            let tally = &mut self.agents[slot];
            tally.guesses += 1;
            tally.correct += record.correct_count;
            tally.elapsed_ms += record.elapsed_ms;
            if record.fallback {
                tally.fallbacks += 1;
            }
            *own_turns.entry(record.player_id).or_default() += 1;
        }

        if let Some(winner) = outcome.winner() {
            let slot = self.slot(winner)?;
            let tally = &mut self.agents[slot];
            tally.wins += 1;
            let taken = own_turns.get(&winner).copied().unwrap_or_default();
            tally.turns_to_win.push(f64::from(taken));
        }

        Ok(())
    }

    pub fn finalize(self, sandbox: Option<GlobalStats>) -> ReportSummary {
        let z = z_score();
        let answer_count = self.answer_count.max(1) as f64;
        let agents = self
            .agents
            .into_iter()
            .map(|tally| tally.into_report(z, answer_count))
            .collect();
        ReportSummary {
            games: self.games,
            exhausted: self.exhausted,
            stopped: self.stopped,
            average_turns: mean(&self.turns),
            agents,
            sandbox,
        }
    }

    fn slot(&self, player_id: PlayerId) -> Result<usize, ReportError> {
        self.by_id
            .get(&player_id)
            .copied()
            .ok_or(ReportError::UnknownPlayer(player_id))
    }
}

struct AgentTally {
    entry: AgentEntry,
    games: usize,
    disqualified: usize,
    wins: usize,
    guesses: usize,
    correct: usize,
    fallbacks: usize,
    elapsed_ms: u64,
    turns_to_win: Vec<f64>,
}

impl AgentTally {
    fn new(entry: AgentEntry) -> Self {
        Self {
            entry,
            games: 0,
            disqualified: 0,
            wins: 0,
            guesses: 0,
            correct: 0,
            fallbacks: 0,
            elapsed_ms: 0,
            turns_to_win: Vec::new(),
        }
    }

    fn into_report(self, z: f64, answer_count: f64) -> AgentReport {
        let per_guess = |total: f64| {
            if self.guesses == 0 {
                0.0
            } else {
                total / self.guesses as f64
            }
        };
        AgentReport {
            name: self.entry.name,
            kind: self.entry.kind,
            label: self.entry.label,
            games: self.games,
            disqualified: self.disqualified,
            wins: self.wins,
            win_rate: rate(self.wins, self.games),
            win_ci95: wilson_interval(self.wins, self.games, z),
            avg_turns_to_win: (!self.turns_to_win.is_empty()).then(|| mean(&self.turns_to_win)),
            accuracy: per_guess(self.correct as f64) / answer_count,
            fallback_rate: rate(self.fallbacks, self.guesses),
            avg_ms_per_turn: per_guess(self.elapsed_ms as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub label: String,
    pub games: usize,
    pub disqualified: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub win_ci95: (f64, f64),
    pub avg_turns_to_win: Option<f64>,
    /// Mean share of the answer set matched per guess.
    pub accuracy: f64,
    pub fallback_rate: f64,
    pub avg_ms_per_turn: f64,
}

#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub games: usize,
    pub exhausted: usize,
    pub stopped: usize,
    pub average_turns: f64,
    pub agents: Vec<AgentReport>,
    pub sandbox: Option<GlobalStats>,
}

impl ReportSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut rows = String::new();
        rows.push_str("# Deduction Bench Summary\n\n");
        rows.push_str(&format!(
            "Games: {} ({} won, {} exhausted, {} stopped), {:.2} turns on average\n\n",
            self.games,
            self.games - self.exhausted - self.stopped,
            self.exhausted,
            self.stopped,
            self.average_turns
        ));
        rows.push_str("| Agent | Kind | Games | Wins | Win % | 95% CI | Avg turns to win | Accuracy | Fallback % | Avg ms/turn | Disqualified |\n");
        rows.push_str("|-------|------|-------|------|-------|--------|------------------|----------|------------|-------------|--------------|\n");

        for agent in &self.agents {
            let turns_to_win = agent
                .avg_turns_to_win
                .map(|turns| format!("{turns:.2}"))
                .unwrap_or_else(|| "-".to_string());
            rows.push_str(&format!(
                "| {name} | {label} | {games} | {wins} | {win:.1}% | [{ci_low:.3}, {ci_high:.3}] | {turns_to_win} | {accuracy:.3} | {fallback:.1}% | {latency:.2} | {dq} |\n",
                name = agent.name,
                label = agent.label,
                games = agent.games,
                wins = agent.wins,
                win = agent.win_rate * 100.0,
                ci_low = agent.win_ci95.0,
                ci_high = agent.win_ci95.1,
                accuracy = agent.accuracy,
                fallback = agent.fallback_rate * 100.0,
                latency = agent.avg_ms_per_turn,
                dq = agent.disqualified,
            ));
        }

        if let Some(stats) = self.sandbox.as_ref() {
            rows.push_str("\n## Sandbox\n\n");
            rows.push_str(&format!(
                "- Executions: {}\n- Success rate: {:.1}%\n- Average: {:.2} ms\n- Peak: {:.2} ms\n",
                stats.executions,
                stats.success_rate * 100.0,
                stats.average_ms,
                stats.peak_ms
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| ReportError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

fn z_score() -> f64 {
    Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + CONFIDENCE / 2.0))
        .unwrap_or(1.96)
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Wilson score interval for a binomial proportion.
fn wilson_interval(successes: usize, trials: usize, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n;
    let centre = (p + z2 / (2.0 * n)) / denominator;
    let margin = z * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt() / denominator;
    ((centre - margin).max(0.0), (centre + margin).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<AgentEntry> {
        vec![
            AgentEntry {
                id: 1,
                name: "easy".into(),
                kind: AgentKind::Builtin,
                label: "builtin/easy".into(),
            },
            AgentEntry {
                id: 2,
                name: "script".into(),
                kind: AgentKind::Custom,
                label: "custom".into(),
            },
        ]
    }

    fn turn(turn: u32, player_id: PlayerId, correct: usize, fallback: bool) -> TurnRecord {
        TurnRecord {
            turn,
            player_id,
            player_name: format!("p{player_id}"),
            guess: vec![0, 1, 2],
            keywords: Vec::new(),
            correct_count: correct,
            elapsed_ms: 10,
            fallback,
        }
    }

    #[test]
    fn z_score_matches_normal_quantile() {
        assert!((z_score() - 1.959_964).abs() < 1e-4);
    }

    #[test]
    fn wilson_interval_brackets_the_rate() {
        let (low, high) = wilson_interval(5, 10, z_score());
        assert!(low < 0.5 && high > 0.5);
        assert_eq!(wilson_interval(0, 0, 1.96), (0.0, 0.0));
        let (low, high) = wilson_interval(10, 10, 1.96);
        assert!(low > 0.6);
        assert!(high <= 1.0);
    }

    #[test]
    fn collects_wins_turns_and_disqualifications() {
        let mut collector = ReportCollector::new(&entries(), 3);
        let won = OutcomeRecord {
            state: FinalState::Won { winner: 1 },
            turns_played: 3,
            answers: vec![0, 1, 2],
        };
        collector
            .record_game(
                &won,
                &[turn(1, 1, 1, false), turn(2, 2, 0, true), turn(3, 1, 3, false)],
                &[],
            )
            .expect("first game");

        let exhausted = OutcomeRecord {
            state: FinalState::Exhausted,
            turns_played: 2,
            answers: vec![0, 1, 2],
        };
        let dq = SessionEvent::PlayerDisqualified {
            player_id: 2,
            errors: vec!["rejected".into()],
        };
        collector
            .record_game(&exhausted, &[turn(1, 1, 2, false), turn(2, 1, 2, false)], &[dq])
            .expect("second game");

        let summary = collector.finalize(None);
        assert_eq!(summary.games, 2);
        assert_eq!(summary.exhausted, 1);
        assert!((summary.average_turns - 2.5).abs() < 1e-9);

        let easy = &summary.agents[0];
        assert_eq!((easy.games, easy.wins), (2, 1));
        assert_eq!(easy.avg_turns_to_win, Some(2.0));
        assert!((easy.accuracy - 8.0 / 12.0).abs() < 1e-9);

        let script = &summary.agents[1];
        assert_eq!((script.games, script.disqualified), (1, 1));
        assert!((script.fallback_rate - 1.0).abs() < 1e-9);
        assert_eq!(script.avg_turns_to_win, None);
    }

    #[test]
    fn unknown_players_are_reported() {
        let mut collector = ReportCollector::new(&entries(), 3);
        let outcome = OutcomeRecord {
            state: FinalState::Exhausted,
            turns_played: 1,
            answers: vec![0, 1, 2],
        };
        let err = collector
            .record_game(&outcome, &[turn(1, 9, 0, false)], &[])
            .expect_err("player 9 is not registered");
        assert!(matches!(err, ReportError::UnknownPlayer(9)));
    }
}
