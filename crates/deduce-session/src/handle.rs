use crate::error::SessionError;
use crate::events::FinalState;
use crate::player::PlayerInfo;
use deduce_core::{GameContext, GuessRecord, KeywordIndex, PlayerId};
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Finished(FinalState),
}

impl SessionState {
    pub fn is_running(self) -> bool {
        self == SessionState::Running
    }
}

/// Public part of the game; the answer set is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    pub keywords: Vec<String>,
    pub answer_count: usize,
    pub history: Vec<GuessRecord>,
    pub revealed_answers: BTreeSet<KeywordIndex>,
    pub revealed_wrongs: BTreeSet<KeywordIndex>,
    pub current_turn: u32,
    pub max_turns: Option<u32>,
}

impl GameSnapshot {
    pub(crate) fn of(ctx: &GameContext) -> Self {
        Self {
            keywords: ctx.keywords().words().to_vec(),
            answer_count: ctx.answer_count(),
            history: ctx.history().to_vec(),
            revealed_answers: ctx.revealed_answers().clone(),
            revealed_wrongs: ctx.revealed_wrongs().clone(),
            current_turn: ctx.current_turn(),
            max_turns: ctx.max_turns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub current_player: Option<PlayerInfo>,
    pub context: Option<GameSnapshot>,
}

impl SessionSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            current_player: None,
            context: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RevealRequest {
    Answer,
    Wrong,
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

#[derive(Debug)]
pub(crate) enum Command {
    HumanGuess {
        indices: Vec<KeywordIndex>,
        reply: Reply<()>,
    },
    TimeoutFallback {
        reply: Reply<()>,
    },
    Reveal {
        request: RevealRequest,
        reply: Reply<Option<KeywordIndex>>,
    },
    Stop,
}

impl Command {
    /// Answers a command that can no longer be served.
    pub(crate) fn reject(self, error: SessionError) {
        match self {
            Command::HumanGuess { reply, .. } | Command::TimeoutFallback { reply } => {
                let _ = reply.send(Err(error));
            }
            Command::Reveal { reply, .. } => {
                let _ = reply.send(Err(error));
            }
            Command::Stop => {}
        }
    }
}

/// Cloneable remote control for a session running elsewhere.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { commands, snapshot }
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn current_player(&self) -> Option<PlayerInfo> {
        self.snapshot.borrow().current_player.clone()
    }

    pub fn context(&self) -> Option<GameSnapshot> {
        self.snapshot.borrow().context.clone()
    }

    /// Resolves once `player_id` is on turn, or with `NotRunning` if the
    /// session ends first.
    pub async fn wait_for_turn(&self, player_id: PlayerId) -> Result<(), SessionError> {
        let mut snapshot = self.snapshot.clone();
        let seen = snapshot
            .wait_for(|snap| {
                matches!(snap.state, SessionState::Finished(_))
                    || (snap.state.is_running()
                        && snap.current_player.as_ref().is_some_and(|p| p.id == player_id))
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        if seen.state.is_running() {
            Ok(())
        } else {
            Err(SessionError::NotRunning)
        }
    }

    pub async fn submit_human_guess(&self, indices: Vec<KeywordIndex>) -> Result<(), SessionError> {
        self.request(|reply| Command::HumanGuess { indices, reply }).await
    }

    /// Delivers an expired UI countdown as a forced random guess.
    pub async fn submit_timeout_fallback(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::TimeoutFallback { reply }).await
    }

    /// Applied at the next turn boundary; `None` when nothing is left to reveal.
    pub async fn reveal_answer_hint(&self) -> Result<Option<KeywordIndex>, SessionError> {
        self.request(|reply| Command::Reveal {
            request: RevealRequest::Answer,
            reply,
        })
        .await
    }

    pub async fn reveal_wrong_hint(&self) -> Result<Option<KeywordIndex>, SessionError> {
        self.request(|reply| Command::Reveal {
            request: RevealRequest::Wrong,
            reply,
        })
        .await
    }

    pub fn stop_session(&self) -> Result<(), SessionError> {
        if !self.state().is_running() {
            return Err(SessionError::NotRunning);
        }
        self.commands
            .send(Command::Stop)
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T, F>(&self, command: F) -> Result<T, SessionError>
    where
        F: FnOnce(Reply<T>) -> Command,
    {
        if !self.state().is_running() {
            return Err(SessionError::NotRunning);
        }
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}
