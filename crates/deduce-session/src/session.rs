use crate::config::SessionConfig;
use crate::error::{ConfigurationError, SessionError};
use crate::events::{
    FinalState, OutcomeRecord, RevealKind, SessionEvent, SessionObserver, TurnRecord,
};
use crate::handle::{
    Command, GameSnapshot, RevealRequest, Reply, SessionHandle, SessionSnapshot, SessionState,
};
use crate::player::{HumanInput, Player, PlayerGuess, PlayerInfo, PlayerKind};
use crate::reveal::{RevealPlan, RevealSchedule, expected_turns};
use deduce_core::model::canonical_guess;
use deduce_core::{GameContext, KeywordIndex, KeywordPool, PlayerId, PlayerView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Level, event};

const TICK: Duration = Duration::from_secs(1);

type PendingReveal = (RevealRequest, Reply<Option<KeywordIndex>>);

enum TurnInput {
    Produced(Result<PlayerGuess, crate::error::PlayerError>),
    Stopped,
}

/// Drives one game from setup to a terminal state. Turns run strictly one
/// after another; every result is in the history before the next starts.
pub struct Session {
    config: SessionConfig,
    players: Vec<Box<dyn Player>>,
    observers: Vec<Box<dyn SessionObserver>>,
    command_tx: mpsc::UnboundedSender<Command>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<SessionSnapshot>,
    rng: StdRng,
    started: bool,
}

impl Session {
    pub fn new(config: SessionConfig, players: Vec<Box<dyn Player>>) -> Self {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(SessionSnapshot::idle());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            players,
            observers: Vec::new(),
            command_tx,
            commands,
            snapshot,
            rng,
            started: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: SessionObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.command_tx.clone(), self.snapshot.subscribe())
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerInfo> + '_ {
        self.players.iter().map(|player| player.info())
    }

    /// Validates the setup, then plays turns until someone matches the whole
    /// answer set, the turn limit is reached, or the session is stopped.
    pub async fn start_session(
        &mut self,
        keywords: Vec<String>,
        answers: Vec<KeywordIndex>,
        hints: BTreeMap<PlayerId, Vec<KeywordIndex>>,
    ) -> Result<OutcomeRecord, ConfigurationError> {
        if self.started {
            return Err(ConfigurationError::AlreadyStarted);
        }
        self.started = true;

        let mut ctx = self.prepare(keywords, &answers, hints)?;
        let mut plans = self.reveal_plans(&ctx);
        let final_state = self.run(&mut ctx, &mut plans).await;

        let outcome = OutcomeRecord {
            state: final_state,
            turns_played: ctx.history().len() as u32,
            answers: ctx.answers().iter().copied().collect(),
        };
        self.snapshot.send_replace(SessionSnapshot {
            state: SessionState::Finished(final_state),
            current_player: None,
            context: Some(GameSnapshot::of(&ctx)),
        });
        while let Ok(command) = self.commands.try_recv() {
            command.reject(SessionError::NotRunning);
        }
        log_outcome(&outcome);
        emit(&mut self.observers, SessionEvent::GameEnded(outcome.clone()));
        Ok(outcome)
    }

    fn prepare(
        &mut self,
        keywords: Vec<String>,
        answers: &[KeywordIndex],
        hints: BTreeMap<PlayerId, Vec<KeywordIndex>>,
    ) -> Result<GameContext, ConfigurationError> {
        let mut ids = BTreeSet::new();
        for player in &self.players {
            if !ids.insert(player.info().id) {
                return Err(ConfigurationError::DuplicatePlayerId(player.info().id));
            }
        }
        if let Some(&owner) = hints.keys().find(|owner| !ids.contains(owner)) {
            return Err(ConfigurationError::UnknownHintOwner(owner));
        }

        let mut eligible: Vec<Box<dyn Player>> = Vec::with_capacity(self.players.len());
        for player in self.players.drain(..) {
            match player.eligibility() {
                Ok(()) => eligible.push(player),
                Err(rejected) => {
                    let player_id = player.info().id;
                    tracing::warn!(
                        target: "deduce_session::turn",
                        player = player_id,
                        reason = "disqualified",
                        message = %rejected
                    );
                    emit(
                        &mut self.observers,
                        SessionEvent::PlayerDisqualified {
                            player_id,
                            errors: rejected.errors,
                        },
                    );
                }
            }
        }
        self.players = eligible;
        let required = self.config.min_players.max(1);
        if self.players.len() < required {
            return Err(ConfigurationError::InsufficientPlayers {
                required,
                available: self.players.len(),
            });
        }

        let pool = KeywordPool::new(keywords)?;
        let ctx = GameContext::new(
            pool,
            answers,
            hints,
            self.config.max_turns,
            self.config.time_limit_secs,
        )?;
        for player in &self.players {
            let player_id = player.info().id;
            let available = ctx.keyword_count() - ctx.hints_for(player_id).len();
            if available < ctx.answer_count() {
                return Err(ConfigurationError::InsufficientCandidates {
                    player_id,
                    needed: ctx.answer_count(),
                    available,
                });
            }
        }
        for player in &mut self.players {
            player.reset();
        }
        Ok(ctx)
    }

    fn reveal_plans(&self, ctx: &GameContext) -> HashMap<PlayerId, RevealPlan> {
        if !self.config.reveal_other_hints {
            return HashMap::new();
        }
        let expected = expected_turns(ctx.keyword_count(), ctx.answer_count(), ctx.max_turns());
        self.players
            .iter()
            .filter_map(|player| match player.info().kind {
                PlayerKind::BuiltInAi(difficulty) => Some((
                    player.info().id,
                    RevealPlan::new(RevealSchedule::for_difficulty(difficulty), expected),
                )),
                _ => None,
            })
            .collect()
    }

    async fn run(
        &mut self,
        ctx: &mut GameContext,
        plans: &mut HashMap<PlayerId, RevealPlan>,
    ) -> FinalState {
        let mut pending: Vec<PendingReveal> = Vec::new();
        let mut slot = 0;
        loop {
            apply_reveals(ctx, &mut pending, &mut self.rng, &mut self.observers);
            let info = self.players[slot].info().clone();
            if let Some(plan) = plans.get_mut(&info.id) {
                share_hints(ctx, info.id, plan, &mut self.rng, &mut self.observers);
            }

            let turn = ctx.current_turn();
            self.snapshot.send_replace(SessionSnapshot {
                state: SessionState::Running,
                current_player: Some(info.clone()),
                context: Some(GameSnapshot::of(ctx)),
            });
            emit(
                &mut self.observers,
                SessionEvent::TurnStarted {
                    turn,
                    player_id: info.id,
                },
            );

            let view = ctx.view_for(info.id);
            let floor = if info.kind.is_ai() {
                thinking_floor(&self.config, &mut self.rng)
            } else {
                Duration::ZERO
            };
            let started = Instant::now();
            let input = play_turn(
                self.players[slot].as_mut(),
                &view,
                floor,
                &mut self.commands,
                &mut self.observers,
                &mut pending,
            )
            .await;
            let produced = match input {
                TurnInput::Produced(produced) => produced,
                TurnInput::Stopped => {
                    for (_, reply) in pending.drain(..) {
                        let _ = reply.send(Err(SessionError::NotRunning));
                    }
                    return FinalState::Stopped;
                }
            };

            let (guess, fallback) = settle(&info, &view, produced, &mut self.rng);
            let record = ctx.record_guess(info.id, &guess);
            let turn_record = TurnRecord {
                turn,
                player_id: info.id,
                player_name: info.name.clone(),
                keywords: ctx.keywords().labels(&record.guessed),
                guess: record.guessed.clone(),
                correct_count: record.correct_count,
                elapsed_ms: started.elapsed().as_millis() as u64,
                fallback,
            };
            log_turn(&turn_record);
            emit(&mut self.observers, SessionEvent::TurnEnded(turn_record));

            if record.correct_count == ctx.answer_count() {
                for (_, reply) in pending.drain(..) {
                    let _ = reply.send(Err(SessionError::NotRunning));
                }
                return FinalState::Won { winner: info.id };
            }
            if ctx.is_exhausted() {
                for (_, reply) in pending.drain(..) {
                    let _ = reply.send(Err(SessionError::NotRunning));
                }
                return FinalState::Exhausted;
            }
            ctx.advance_turn();
            slot = (slot + 1) % self.players.len();
        }
    }
}

/// Awaits the player's guess while serving handle commands and the advisory
/// one-second timer.
async fn play_turn(
    player: &mut dyn Player,
    view: &PlayerView,
    floor: Duration,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    observers: &mut [Box<dyn SessionObserver>],
    pending: &mut Vec<PendingReveal>,
) -> TurnInput {
    let player_id = player.info().id;
    let is_ai = player.info().kind.is_ai();
    let inbox = player.inbox();
    let mut delivered = false;
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let pause = tokio::time::sleep_until(started + floor);
    tokio::pin!(pause);

    if is_ai {
        emit(observers, SessionEvent::AiThinking { player_id, thinking: true });
    }
    let mut guess = player.produce_guess(view);
    let mut produced = None;
    let input = loop {
        tokio::select! {
            result = &mut guess, if produced.is_none() => {
                produced = Some(result);
            }
            () = &mut pause, if produced.is_some() => {
                if let Some(result) = produced.take() {
                    break TurnInput::Produced(result);
                }
            }
            Some(command) = commands.recv() => match command {
                Command::HumanGuess { indices, reply } => {
                    let outcome = match (&inbox, delivered) {
                        (Some(inbox), false) => match view.check(&indices) {
                            Ok(()) => {
                                delivered = true;
                                inbox.send(HumanInput::Guess(indices)).map_err(|_| SessionError::Closed)
                            }
                            Err(err) => Err(SessionError::InvalidHumanGuess(err)),
                        },
                        _ => Err(SessionError::NotHumanTurn),
                    };
                    let _ = reply.send(outcome);
                }
                Command::TimeoutFallback { reply } => {
                    let outcome = match (&inbox, delivered) {
                        (Some(inbox), false) => {
                            delivered = true;
                            inbox.send(HumanInput::Fallback).map_err(|_| SessionError::Closed)
                        }
                        _ => Err(SessionError::NotHumanTurn),
                    };
                    let _ = reply.send(outcome);
                }
                Command::Reveal { request, reply } => pending.push((request, reply)),
                Command::Stop => break TurnInput::Stopped,
            },
            _ = ticker.tick() => {
                let elapsed = started.elapsed().as_secs() as u32;
                let remaining_secs = view.time_limit_secs.saturating_sub(elapsed);
                emit(observers, SessionEvent::TimerTick { player_id, remaining_secs });
            }
        }
    };
    drop(guess);
    if is_ai {
        emit(observers, SessionEvent::AiThinking { player_id, thinking: false });
    }
    input
}

/// Turns whatever the player produced into a legal guess.
fn settle(
    info: &PlayerInfo,
    view: &PlayerView,
    produced: Result<PlayerGuess, crate::error::PlayerError>,
    rng: &mut StdRng,
) -> (Vec<KeywordIndex>, bool) {
    let failure = match produced {
        Ok(guess) => match view.check(&guess.indices) {
            Ok(()) => return (canonical_guess(&guess.indices), guess.fallback),
            Err(err) => err.to_string(),
        },
        Err(err) => err.to_string(),
    };
    tracing::warn!(
        target: "deduce_session::turn",
        player = info.id,
        turn = view.current_turn,
        reason = "player_failed",
        message = %failure
    );
    (view.fallback_guess(rng), true)
}

fn thinking_floor(config: &SessionConfig, rng: &mut StdRng) -> Duration {
    let jitter = if config.thinking_jitter_ms > 0 {
        rng.gen_range(0..=config.thinking_jitter_ms)
    } else {
        0
    };
    config.min_thinking() + Duration::from_millis(jitter)
}

fn apply_reveals(
    ctx: &mut GameContext,
    pending: &mut Vec<PendingReveal>,
    rng: &mut StdRng,
    observers: &mut [Box<dyn SessionObserver>],
) {
    for (request, reply) in pending.drain(..) {
        let (kind, revealed) = match request {
            RevealRequest::Answer => (RevealKind::Answer, ctx.reveal_answer(rng)),
            RevealRequest::Wrong => (RevealKind::Wrong, ctx.reveal_wrong(rng)),
        };
        if let Some(index) = revealed {
            emit(observers, SessionEvent::HintRevealed { kind, index });
        }
        let _ = reply.send(Ok(revealed));
    }
}

fn share_hints(
    ctx: &mut GameContext,
    player_id: PlayerId,
    plan: &mut RevealPlan,
    rng: &mut StdRng,
    observers: &mut [Box<dyn SessionObserver>],
) {
    let due = plan.due(ctx.current_turn());
    for _ in 0..due {
        let Some((owner, index)) = ctx.share_hint_with(player_id, rng) else {
            break;
        };
        emit(
            observers,
            SessionEvent::HintRevealed {
                kind: RevealKind::SharedHint {
                    owner,
                    with: player_id,
                },
                index,
            },
        );
    }
}

fn emit(observers: &mut [Box<dyn SessionObserver>], event: SessionEvent) {
    for observer in observers.iter_mut() {
        observer.notify(&event);
    }
}

fn log_turn(record: &TurnRecord) {
    if record.fallback {
        tracing::warn!(
            target: "deduce_session::turn",
            player = record.player_id,
            turn = record.turn,
            reason = "fallback_guess",
            message = "turn played with a random fallback guess"
        );
    }

    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "deduce_session::turn",
        Level::INFO,
        turn = record.turn,
        player = record.player_id,
        guess = ?record.guess,
        correct = record.correct_count,
        elapsed_ms = record.elapsed_ms,
        fallback = record.fallback,
    );
}

fn log_outcome(outcome: &OutcomeRecord) {
    event!(
        target: "deduce_session::turn",
        Level::INFO,
        state = ?outcome.state,
        turns = outcome.turns_played,
        winner = ?outcome.winner(),
    );
}
