use std::collections::BTreeMap;
use std::sync::Arc;

use deduce_bot::{Difficulty, StrategyConfig};
use deduce_core::PlayerView;
use deduce_sandbox::{SandboxExecutor, SandboxLimits};
use deduce_session::{
    BuiltInAiPlayer, ConfigurationError, CustomAiPlayer, EventRecorder, FinalState, GuessFut,
    HumanPlayer, Player, PlayerGuess, PlayerInfo, PlayerKind, RevealKind, Session, SessionConfig,
    SessionError, SessionEvent, SessionState,
};

/// Plays a fixed list of guesses, cycling.
struct Scripted {
    info: PlayerInfo,
    guesses: Vec<Vec<usize>>,
    next: usize,
}

impl Scripted {
    fn boxed(id: u32, guesses: Vec<Vec<usize>>) -> Box<dyn Player> {
        Box::new(Self {
            info: PlayerInfo {
                id,
                name: format!("scripted-{id}"),
                kind: PlayerKind::CustomAi,
            },
            guesses,
            next: 0,
        })
    }
}

impl Player for Scripted {
    fn info(&self) -> &PlayerInfo {
        &self.info
    }

    fn produce_guess<'a>(&'a mut self, _view: &'a PlayerView) -> GuessFut<'a> {
        Box::pin(async move {
            let guess = self.guesses[self.next % self.guesses.len()].clone();
            self.next += 1;
            Ok(PlayerGuess {
                indices: guess,
                fallback: false,
            })
        })
    }
}

fn keywords() -> Vec<String> {
    (0..10).map(|i| format!("kw{i}")).collect()
}

fn config(max_turns: u32) -> SessionConfig {
    SessionConfig {
        max_turns: Some(max_turns),
        seed: Some(11),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn turn_limit_ends_without_winner() {
    let players = vec![Scripted::boxed(1, vec![vec![0, 2, 3], vec![5, 6, 8]])];
    let mut session = Session::new(config(5), players);
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());
    let handle = session.handle();

    let outcome = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::from([(1, vec![9])]))
        .await
        .unwrap();

    assert_eq!(outcome.state, FinalState::Exhausted);
    assert_eq!(outcome.winner(), None);
    assert_eq!(outcome.turns_played, 5);
    let turns = recorder.turns();
    assert_eq!(turns.len(), 5);
    assert!(turns.iter().all(|turn| turn.correct_count == 0));
    assert_eq!(turns[4].turn, 5);
    assert_eq!(handle.state(), SessionState::Finished(FinalState::Exhausted));
    assert!(matches!(
        recorder.events().last(),
        Some(SessionEvent::GameEnded(_))
    ));
    assert_eq!(handle.submit_human_guess(vec![0, 1, 2]).await, Err(SessionError::NotRunning));
}

#[tokio::test]
async fn correct_counts_and_winner() {
    let players = vec![
        Scripted::boxed(1, vec![vec![1, 4, 9], vec![1, 4, 2]]),
        Scripted::boxed(2, vec![vec![2, 4, 7], vec![1, 4, 7]]),
    ];
    let mut session = Session::new(config(20), players);
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());

    let outcome = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(outcome.winner(), Some(2));
    let counts: Vec<(u32, usize)> = recorder
        .turns()
        .iter()
        .map(|turn| (turn.player_id, turn.correct_count))
        .collect();
    assert_eq!(counts, vec![(1, 2), (2, 2), (1, 2), (2, 3)]);
    assert_eq!(recorder.turns()[3].keywords, vec!["kw1", "kw4", "kw7"]);
}

#[tokio::test(start_paused = true)]
async fn human_turns_go_through_the_handle() {
    let players: Vec<Box<dyn Player>> = vec![
        Box::new(HumanPlayer::new(1, "ada", 3)),
        Scripted::boxed(2, vec![vec![0, 2, 3]]),
    ];
    let mut session = Session::new(config(4), players);
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());
    let handle = session.handle();

    let driver = async {
        handle.wait_for_turn(1).await.unwrap();
        assert_eq!(handle.current_player().map(|p| p.id), Some(1));
        assert_eq!(handle.context().unwrap().current_turn, 1);

        let own_hint = handle.submit_human_guess(vec![5, 1, 2]).await;
        assert!(matches!(own_hint, Err(SessionError::InvalidHumanGuess(_))));

        tokio::time::sleep(std::time::Duration::from_millis(2_500)).await;
        let (revealed, submitted) = tokio::join!(
            handle.reveal_answer_hint(),
            handle.submit_human_guess(vec![0, 2, 3]),
        );
        assert_eq!(submitted, Ok(()));
        let revealed = revealed.unwrap().unwrap();
        assert!([1, 4, 7].contains(&revealed));

        // The reveal is answered at the next boundary, so this is turn 3.
        handle.wait_for_turn(1).await.unwrap();
        let snapshot = handle.context().unwrap();
        assert_eq!(snapshot.current_turn, 3);
        assert!(snapshot.revealed_answers.contains(&revealed));
        handle.submit_timeout_fallback().await.unwrap();
    };

    let (outcome, ()) = tokio::join!(
        session.start_session(keywords(), vec![1, 4, 7], BTreeMap::from([(1, vec![5])])),
        driver
    );
    let outcome = outcome.unwrap();
    assert!(matches!(
        outcome.state,
        FinalState::Exhausted | FinalState::Won { winner: 1 }
    ));

    let turns = recorder.turns();
    assert!(turns.len() >= 3);
    assert_eq!(turns[0].guess, vec![0, 2, 3]);
    assert!(!turns[0].fallback);
    assert!(turns[2].fallback);
    assert!(!turns[2].guess.contains(&5));

    let ticks: Vec<u32> = recorder
        .events()
        .iter()
        .filter_map(|event| match event {
            SessionEvent::TimerTick { player_id: 1, remaining_secs } => Some(*remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(&ticks[..2], &[59, 58]);
    assert!(recorder.events().iter().any(|event| matches!(
        event,
        SessionEvent::HintRevealed { kind: RevealKind::Answer, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn stop_ends_a_running_session() {
    let players = vec![Scripted::boxed(2, vec![vec![0, 2, 3]])];
    let config = SessionConfig {
        min_thinking_ms: 10_000,
        ..config(10)
    };
    let mut session = Session::new(config, players);
    let handle = session.handle();
    assert_eq!(handle.stop_session(), Err(SessionError::NotRunning));

    let driver = async {
        handle.wait_for_turn(2).await.unwrap();
        assert_eq!(
            handle.submit_human_guess(vec![0, 2, 3]).await,
            Err(SessionError::NotHumanTurn)
        );
        handle.stop_session().unwrap();
    };
    let (outcome, ()) = tokio::join!(
        session.start_session(keywords(), vec![1, 4, 7], BTreeMap::new()),
        driver
    );
    let outcome = outcome.unwrap();
    assert_eq!(outcome.state, FinalState::Stopped);
    assert_eq!(outcome.turns_played, 0);
    assert_eq!(handle.state(), SessionState::Finished(FinalState::Stopped));
}

#[tokio::test]
async fn rejected_snippet_disqualifies_only_that_player() {
    let executor = Arc::new(SandboxExecutor::new(SandboxLimits::default()).unwrap());
    let players: Vec<Box<dyn Player>> = vec![
        Box::new(CustomAiPlayer::new(
            3,
            "sneaky",
            "fn make_guess(state) { eval(\"[0, 1, 2]\") }",
            Arc::clone(&executor),
            1,
        )),
        Scripted::boxed(1, vec![vec![1, 4, 7]]),
    ];
    let mut session = Session::new(config(5), players);
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());

    let outcome = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::new())
        .await
        .unwrap();
    assert_eq!(outcome.winner(), Some(1));
    assert!(matches!(
        recorder.events().first(),
        Some(SessionEvent::PlayerDisqualified { player_id: 3, .. })
    ));
    assert!(recorder.turns().iter().all(|turn| turn.player_id == 1));
}

#[tokio::test]
async fn too_few_eligible_players_is_a_configuration_error() {
    let executor = Arc::new(SandboxExecutor::new(SandboxLimits::default()).unwrap());
    let players: Vec<Box<dyn Player>> = vec![
        Box::new(CustomAiPlayer::new(3, "broken", "fn nope() { 1 }", executor, 1)),
        Scripted::boxed(1, vec![vec![0, 2, 3]]),
    ];
    let config = SessionConfig {
        min_players: 2,
        ..config(5)
    };
    let mut session = Session::new(config, players);
    let err = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InsufficientPlayers {
            required: 2,
            available: 1,
        }
    );
}

#[tokio::test]
async fn invalid_setups_are_rejected_before_any_turn() {
    let recorder = EventRecorder::new();
    let mut session = Session::new(
        config(5),
        vec![Scripted::boxed(1, vec![vec![0, 2, 3]]), Scripted::boxed(1, vec![vec![0, 2, 3]])],
    );
    session.subscribe(recorder.clone());
    let err = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::new())
        .await
        .unwrap_err();
    assert_eq!(err, ConfigurationError::DuplicatePlayerId(1));
    assert!(recorder.turns().is_empty());

    let mut session = Session::new(config(5), vec![Scripted::boxed(1, vec![vec![0, 2, 3]])]);
    let err = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::from([(1, vec![4])]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidGame(_)));

    let mut session = Session::new(config(5), vec![Scripted::boxed(1, vec![vec![0, 2, 3]])]);
    let err = session
        .start_session(keywords(), vec![1, 4, 7], BTreeMap::from([(9, vec![0])]))
        .await
        .unwrap_err();
    assert_eq!(err, ConfigurationError::UnknownHintOwner(9));
}

#[tokio::test(start_paused = true)]
async fn built_in_players_learn_other_hints() {
    let players: Vec<Box<dyn Player>> = vec![
        Box::new(BuiltInAiPlayer::new(
            1,
            "hard",
            Difficulty::Hard,
            StrategyConfig::default(),
            4,
        )),
        Scripted::boxed(2, vec![vec![0, 2, 3], vec![2, 3, 5]]),
    ];
    let config = SessionConfig {
        min_thinking_ms: 400,
        thinking_jitter_ms: 100,
        ..config(6)
    };
    let mut session = Session::new(config, players);
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());
    let hints = BTreeMap::from([(1, vec![0]), (2, vec![9, 8, 6])]);
    session
        .start_session(keywords(), vec![1, 4, 7], hints)
        .await
        .unwrap();

    let shared: Vec<usize> = recorder
        .events()
        .iter()
        .filter_map(|event| match event {
            SessionEvent::HintRevealed {
                kind: RevealKind::SharedHint { owner: 2, with: 1 },
                index,
            } => Some(*index),
            _ => None,
        })
        .collect();
    assert!(!shared.is_empty());
    assert!(shared.iter().all(|index| [9, 8, 6].contains(index)));

    let thinking = recorder
        .events()
        .iter()
        .filter(|event| matches!(event, SessionEvent::AiThinking { player_id: 1, thinking: true }))
        .count();
    assert!(thinking >= 1);
    for turn in recorder.turns().iter().filter(|turn| turn.player_id == 1) {
        assert!(turn.elapsed_ms >= 400);
        assert!(!turn.guess.contains(&0));
    }
}
