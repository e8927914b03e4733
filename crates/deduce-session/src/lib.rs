//! Turn-based orchestration of a deduction game between human, built-in and
//! custom AI players.

mod config;
mod error;
mod events;
mod handle;
pub mod player;
pub mod reveal;
mod session;

pub use config::SessionConfig;
pub use error::{ConfigurationError, PlayerError, SessionError};
pub use events::{
    EventRecorder, FinalState, OutcomeRecord, RevealKind, SessionEvent, SessionObserver,
    TurnRecord,
};
pub use handle::{GameSnapshot, SessionHandle, SessionSnapshot, SessionState};
pub use player::{
    BuiltInAiPlayer, CustomAiPlayer, GuessFut, HumanInbox, HumanInput, HumanPlayer, Player,
    PlayerGuess, PlayerInfo, PlayerKind,
};
pub use session::Session;
