use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deduce_bot::{Difficulty, StrategyConfig};
use deduce_core::PlayerId;
use deduce_sandbox::SandboxExecutor;
use deduce_session::{
    BuiltInAiPlayer, ConfigurationError, CustomAiPlayer, EventRecorder, FinalState, Player,
    Session, TurnRecord,
};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{AgentConfig, AgentKind, BenchConfig, ResolvedOutputs};
use crate::generator::deal_game;
use crate::report::{AgentEntry, ReportCollector, ReportError, ReportSummary};

const PLAYER_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Primary entry point for playing a configured series of games.
pub struct TournamentRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    strategy: StrategyConfig,
    executor: Arc<SandboxExecutor>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub report: ReportSummary,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration. Snippet files are read
    /// here so a missing script fails before any game is played.
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents)?;
        let executor = SandboxExecutor::new(config.session.sandbox.clone())
            .map_err(|err| RunnerError::Sandbox(err.to_string()))?;
        let strategy = config
            .session
            .strategy
            .clone()
            .with_overrides(|key| std::env::var(key).ok())
            .sanitized();

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            agents,
            strategy,
            executor: Arc::new(executor),
        })
    }

    /// Play every game, streaming one JSONL row per turn to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let entries: Vec<AgentEntry> = self.agents.iter().map(AgentBlueprint::entry).collect();
        let mut report = ReportCollector::new(&entries, self.config.games.answer_count);
        let mut rows_written = 0usize;

        for game_index in 0..self.config.games.count {
            let game_seed = rng.next_u64();
            let game_id = format!("G{game_index:05}");

            let recorder = EventRecorder::new();
            let mut session = Session::new(
                self.config.session_for(game_seed),
                self.build_players(game_seed),
            );
            session.subscribe(recorder.clone());

            let ids: Vec<PlayerId> = self.agents.iter().map(|agent| agent.id).collect();
            let deal = deal_game(&self.config.games, &ids, game_seed);
            let outcome = runtime
                .block_on(session.start_session(deal.keywords, deal.answers, deal.hints))
                .map_err(|source| RunnerError::Game {
                    game_id: game_id.clone(),
                    source,
                })?;

            let turns = recorder.turns();
            rows_written += write_turn_rows(
                &mut writer,
                &self.config.run_id,
                &game_id,
                game_seed,
                &turns,
            )?;
            report.record_game(&outcome, &turns, &recorder.events())?;
            log_game(&game_id, game_seed, &outcome.state, outcome.turns_played);
        }

        writer.flush()?;

        let sandbox = self
            .agents
            .iter()
            .any(|agent| agent.kind == AgentKind::Custom)
            .then(|| self.executor.global_stats());
        let summary = report.finalize(sandbox);
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_path = self.logging_enabled.then(|| {
            self.outputs
                .summary_md
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("telemetry.jsonl")
        });

        Ok(RunSummary {
            games_played: self.config.games.count,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            report: summary,
        })
    }

    fn build_players(&self, game_seed: u64) -> Vec<Box<dyn Player>> {
        self.agents
            .iter()
            .map(|agent| {
                let seed = game_seed ^ PLAYER_SEED_STRIDE.wrapping_mul(u64::from(agent.id));
                let player: Box<dyn Player> = match &agent.source {
                    AgentSource::Builtin(difficulty) => Box::new(BuiltInAiPlayer::new(
                        agent.id,
                        agent.name.clone(),
                        *difficulty,
                        self.strategy.clone(),
                        seed,
                    )),
                    AgentSource::Custom(code) => Box::new(CustomAiPlayer::new(
                        agent.id,
                        agent.name.clone(),
                        code.clone(),
                        Arc::clone(&self.executor),
                        seed,
                    )),
                };
                player
            })
            .collect()
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct TurnLogRow<'a> {
    run_id: &'a str,
    game_id: &'a str,
    game_seed: u64,
    #[serde(flatten)]
    turn: &'a TurnRecord,
}

fn write_turn_rows(
    writer: &mut BufWriter<File>,
    run_id: &str,
    game_id: &str,
    game_seed: u64,
    turns: &[TurnRecord],
) -> Result<usize, RunnerError> {
    for turn in turns {
        let row = TurnLogRow {
            run_id,
            game_id,
            game_seed,
            turn,
        };
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
    }
    Ok(turns.len())
}

fn log_game(game_id: &str, game_seed: u64, state: &FinalState, turns_played: u32) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }
    let (result, winner) = match state {
        FinalState::Won { winner } => ("won", Some(*winner)),
        FinalState::Exhausted => ("exhausted", None),
        FinalState::Stopped => ("stopped", None),
    };
    event!(
        target: "deduce_bench::game",
        Level::INFO,
        game_id,
        game_seed,
        result,
        winner = winner.map(i64::from).unwrap_or(-1),
        turns_played,
    );
}

enum AgentSource {
    Builtin(Difficulty),
    Custom(String),
}

struct AgentBlueprint {
    id: PlayerId,
    name: String,
    kind: AgentKind,
    source: AgentSource,
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, RunnerError> {
        configs
            .iter()
            .zip(1..)
            .map(|(config, id)| Self::from_config(config, id))
            .collect()
    }

    fn from_config(config: &AgentConfig, id: PlayerId) -> Result<Self, RunnerError> {
        let source = match config.kind {
            AgentKind::Builtin => {
                AgentSource::Builtin(config.difficulty.unwrap_or_else(Difficulty::from_env))
            }
            AgentKind::Custom => {
                let path = config
                    .snippet
                    .clone()
                    .ok_or_else(|| RunnerError::MissingSnippet {
                        agent: config.name.clone(),
                    })?;
                let code = fs::read_to_string(&path).map_err(|source| RunnerError::Snippet {
                    agent: config.name.clone(),
                    path,
                    source,
                })?;
                AgentSource::Custom(code)
            }
        };
        Ok(Self {
            id,
            name: config.name.clone(),
            kind: config.kind,
            source,
        })
    }

    fn entry(&self) -> AgentEntry {
        let label = match &self.source {
            AgentSource::Builtin(difficulty) => format!("builtin/{}", difficulty.as_str()),
            AgentSource::Custom(_) => "custom".to_string(),
        };
        AgentEntry {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            label,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("agent '{agent}' has no snippet file")]
    MissingSnippet { agent: String },
    #[error("failed to read snippet for agent '{agent}' at {path:?}: {source}")]
    Snippet {
        agent: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sandbox setup failed: {0}")]
    Sandbox(String),
    #[error("game {game_id} could not start: {source}")]
    Game {
        game_id: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}
