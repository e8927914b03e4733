use deduce_core::{KeywordIndex, PlayerId};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// One scored turn, in the form handed to persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub guess: Vec<KeywordIndex>,
    pub keywords: Vec<String>,
    pub correct_count: usize,
    pub elapsed_ms: u64,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalState {
    Won { winner: PlayerId },
    Exhausted,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub state: FinalState,
    pub turns_played: u32,
    pub answers: Vec<KeywordIndex>,
}

impl OutcomeRecord {
    pub fn winner(&self) -> Option<PlayerId> {
        match self.state {
            FinalState::Won { winner } => Some(winner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealKind {
    Answer,
    Wrong,
    SharedHint { owner: PlayerId, with: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    TurnStarted { turn: u32, player_id: PlayerId },
    TurnEnded(TurnRecord),
    GameEnded(OutcomeRecord),
    TimerTick { player_id: PlayerId, remaining_secs: u32 },
    AiThinking { player_id: PlayerId, thinking: bool },
    PlayerDisqualified { player_id: PlayerId, errors: Vec<String> },
    HintRevealed { kind: RevealKind, index: KeywordIndex },
}

/// Receives lifecycle notifications in the order they happen.
pub trait SessionObserver: Send {
    fn notify(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn notify(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Keeps every event; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn turns(&self) -> Vec<TurnRecord> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::TurnEnded(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for EventRecorder {
    fn notify(&mut self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}
