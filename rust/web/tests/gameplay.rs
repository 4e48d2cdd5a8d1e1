/// Move orchestration: broadcasts, rejections, automated replies, game over.
use fourinrow_ai::{Opponent, OpponentError};
use fourinrow_engine::board::Cell;
use fourinrow_engine::errors::MoveError;
use fourinrow_engine::game::{Game, Outcome};
use fourinrow_engine::player::{Color, Participant};
use fourinrow_engine::rules::apply_move;
use fourinrow_web::connection::Connection;
use fourinrow_web::game::{GameHandle, GameSlot, SeatLink};
use fourinrow_web::orchestrator::{MoveOrchestrator, TurnResult};
use fourinrow_web::persistence::{DisabledRepository, MatchRecorder, SqliteRepository};
use fourinrow_web::protocol::ServerMessage;
use fourinrow_web::server::{AppContext, ServerConfig};
use fourinrow_web::settings::GameSettings;
use fourinrow_web::telemetry::{EventType, Telemetry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

type Inbox = UnboundedReceiver<ServerMessage>;

async fn next_message(rx: &mut Inbox) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message before timeout")
        .expect("connection open")
}

async fn next_update(rx: &mut Inbox) -> Game {
    match next_message(rx).await {
        ServerMessage::Update(game) => game,
        other => panic!("expected update, got {other:?}"),
    }
}

fn settings() -> GameSettings {
    GameSettings {
        matchmaking_timeout_ms: 100,
        grace_period_ms: 10_000,
        think_delay_ms: 20,
        ..GameSettings::default()
    }
}

fn context() -> AppContext {
    AppContext::with_repository(
        ServerConfig::for_tests().with_settings(settings()),
        Arc::new(DisabledRepository),
    )
    .expect("context")
}

/// Pairs alice (seat one) with bob and drains the start/update messages.
async fn human_game(context: &AppContext) -> (Arc<GameHandle>, Inbox, Inbox) {
    let (alice, mut alice_rx) = Connection::channel();
    let (bob, mut bob_rx) = Connection::channel();
    context.matchmaker().join("alice", alice).expect("alice joins");
    context.matchmaker().join("bob", bob).expect("bob joins");

    assert!(matches!(next_message(&mut alice_rx).await, ServerMessage::Waiting(_)));
    for rx in [&mut alice_rx, &mut bob_rx] {
        assert!(matches!(next_message(rx).await, ServerMessage::Start(_)));
        next_update(rx).await;
    }
    let handle = context
        .registry()
        .find_active_by_participant("alice")
        .expect("active game");
    (handle, alice_rx, bob_rx)
}

/// Seats alice against the automated opponent.
async fn automated_game(context: &AppContext) -> (Arc<GameHandle>, Inbox) {
    let (alice, mut alice_rx) = Connection::channel();
    context.matchmaker().join("alice", alice).expect("alice joins");
    assert!(matches!(next_message(&mut alice_rx).await, ServerMessage::Waiting(_)));
    assert!(matches!(next_message(&mut alice_rx).await, ServerMessage::Start(_)));
    next_update(&mut alice_rx).await;
    let handle = context
        .registry()
        .find_active_by_participant("alice")
        .expect("active game");
    (handle, alice_rx)
}

#[tokio::test]
async fn accepted_move_is_broadcast_to_both_seats() {
    let context = context();
    let (handle, mut alice_rx, mut bob_rx) = human_game(&context).await;
    let orchestrator = context.orchestrator();

    let result = orchestrator
        .handle_move(&handle, "alice", 3)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Applied);

    for rx in [&mut alice_rx, &mut bob_rx] {
        let game = next_update(rx).await;
        assert_eq!(game.board().get(5, 3), Cell::Occupied(Color::One));
        assert_eq!(game.current_turn(), game.participants()[1].id());
    }
}

#[tokio::test]
async fn rejected_move_is_reported_to_the_mover_only() {
    let context = context();
    let (handle, mut alice_rx, mut bob_rx) = human_game(&context).await;
    let orchestrator = context.orchestrator();

    let result = orchestrator
        .handle_move(&handle, "bob", 3)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Rejected(MoveError::OutOfTurn));
    assert_eq!(
        next_message(&mut bob_rx).await,
        ServerMessage::Error("not your turn".into())
    );

    let result = orchestrator
        .handle_move(&handle, "alice", 7)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Rejected(MoveError::InvalidColumn));
    assert_eq!(
        next_message(&mut alice_rx).await,
        ServerMessage::Error("invalid column".into())
    );

    assert!(alice_rx.try_recv().is_err());
    assert!(bob_rx.try_recv().is_err());
    let game = handle.snapshot().expect("snapshot");
    assert_eq!(game.board().legal_columns().len(), 7);
    assert_eq!(game.board().landing_row(3), Some(5));
}

#[tokio::test]
async fn unseated_sender_is_dropped_silently() {
    let context = context();
    let (handle, mut alice_rx, mut bob_rx) = human_game(&context).await;

    let result = context
        .orchestrator()
        .handle_move(&handle, "mallory", 0)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Dropped);
    assert!(alice_rx.try_recv().is_err());
    assert!(bob_rx.try_recv().is_err());
}

#[tokio::test]
async fn winning_move_finishes_and_records_the_game() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repository = Arc::new(SqliteRepository::open(dir.path().join("games.db")).expect("open"));
    let context = AppContext::with_repository(
        ServerConfig::for_tests().with_settings(settings()),
        repository.clone(),
    )
    .expect("context");
    let (handle, mut alice_rx, mut bob_rx) = human_game(&context).await;
    let orchestrator = context.orchestrator();

    for _ in 0..3 {
        orchestrator.handle_move(&handle, "alice", 0).await.expect("alice");
        orchestrator.handle_move(&handle, "bob", 1).await.expect("bob");
    }
    let result = orchestrator
        .handle_move(&handle, "alice", 0)
        .await
        .expect("winning move");
    assert_eq!(result, TurnResult::Finished);

    let mut last = None;
    while let Ok(message) = bob_rx.try_recv() {
        last = Some(message);
    }
    let final_state = match last {
        Some(ServerMessage::Update(game)) => game,
        other => panic!("expected final update, got {other:?}"),
    };
    let alice_id = final_state.participants()[0].id().to_string();
    assert!(!final_state.is_active());
    assert_eq!(
        final_state.outcome(),
        Some(&Outcome::Win {
            participant: alice_id
        })
    );

    let result = orchestrator
        .handle_move(&handle, "bob", 2)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Rejected(MoveError::NotActive));
    while let Ok(message) = alice_rx.try_recv() {
        assert!(!matches!(message, ServerMessage::Error(_)));
    }

    let game_id = handle.id().to_string();
    let record = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(record) = repository.load(&game_id).expect("load") {
                break record;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("record saved");
    assert_eq!(record.outcome, "win");
    assert_eq!(record.winner.as_deref(), Some("alice"));
    assert_eq!(record.player_two, "bob");
    assert!(context.registry().find_active_by_participant("alice").is_none());
}

#[tokio::test]
async fn automated_seat_replies_after_thinking() {
    let context = context();
    let (handle, mut alice_rx) = automated_game(&context).await;

    let result = context
        .orchestrator()
        .handle_move(&handle, "alice", 0)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Applied);

    let after_human = next_update(&mut alice_rx).await;
    assert_eq!(after_human.board().get(5, 0), Cell::Occupied(Color::One));
    assert_eq!(after_human.current_turn(), after_human.participants()[1].id());

    let after_bot = next_update(&mut alice_rx).await;
    assert_eq!(after_bot.board().get(5, 3), Cell::Occupied(Color::Two));
    assert_eq!(after_bot.current_turn(), after_bot.participants()[0].id());
}

#[tokio::test]
async fn moves_queue_behind_the_automated_reply() {
    let context = Arc::new(context());
    let (handle, _alice_rx) = automated_game(&context).await;

    let first = {
        let ctx = Arc::clone(&context);
        let handle = Arc::clone(&handle);
        tokio::spawn(async move { ctx.orchestrator().handle_move(&handle, "alice", 0).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let ctx = Arc::clone(&context);
        let handle = Arc::clone(&handle);
        tokio::spawn(async move { ctx.orchestrator().handle_move(&handle, "alice", 6).await })
    };

    assert_eq!(
        first.await.expect("task").expect("handled"),
        TurnResult::Applied
    );
    assert_eq!(
        second.await.expect("task").expect("handled"),
        TurnResult::Applied
    );

    let game = handle.snapshot().expect("snapshot");
    assert_eq!(game.board().get(5, 0), Cell::Occupied(Color::One));
    assert_eq!(game.board().get(5, 6), Cell::Occupied(Color::One));
    let discs = (0..6)
        .flat_map(|row| (0..7).map(move |col| (row, col)))
        .filter(|&(row, col)| game.board().get(row, col) != Cell::Empty)
        .count();
    assert_eq!(discs, 4);
}

/// Opponent that always gives the same answer.
struct ScriptedOpponent(Result<usize, OpponentError>);

impl Opponent for ScriptedOpponent {
    fn best_move(&self, _game: &Game, _color: Color) -> Result<usize, OpponentError> {
        self.0.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Alice against `opponent`, with `stacked` columns each filled by one
/// disc per seat before play starts.
fn scripted_table(
    opponent: ScriptedOpponent,
    stacked: &[usize],
) -> (MoveOrchestrator, GameHandle, Inbox) {
    let mut game = Game::new(
        "scripted",
        Participant::human("h", "alice", Color::One),
        Participant::automated("bot", "Bot", Color::Two),
    );
    for &col in stacked {
        apply_move(&mut game, "h", col as i64).expect("alice stacks");
        apply_move(&mut game, "bot", col as i64).expect("bot stacks");
    }
    let (alice, alice_rx) = Connection::channel();
    let slot = GameSlot::new(game, HashMap::from([("h".to_string(), SeatLink::bound(alice))]));
    let orchestrator = MoveOrchestrator::new(
        Arc::new(opponent),
        MatchRecorder::new(Arc::new(DisabledRepository), Telemetry::new()),
        Duration::from_millis(5),
    );
    (orchestrator, GameHandle::new(slot), alice_rx)
}

async fn assert_bot_lands(opponent: ScriptedOpponent, stacked: &[usize], row: usize, col: usize) {
    let (orchestrator, handle, mut alice_rx) = scripted_table(opponent, stacked);

    let result = orchestrator
        .handle_move(&handle, "alice", 0)
        .await
        .expect("handled");
    assert_eq!(result, TurnResult::Applied);

    next_update(&mut alice_rx).await;
    let after_bot = next_update(&mut alice_rx).await;
    assert_eq!(after_bot.board().get(row, col), Cell::Occupied(Color::Two));
    assert_eq!(after_bot.current_turn(), "h");
    assert!(alice_rx.try_recv().is_err());
}

#[tokio::test]
async fn failing_opponent_falls_back_to_center_column() {
    let opponent = ScriptedOpponent(Err(OpponentError::Internal("search exploded".into())));
    assert_bot_lands(opponent, &[], 5, 3).await;
}

#[tokio::test]
async fn out_of_range_choice_falls_back_to_center_column() {
    assert_bot_lands(ScriptedOpponent(Ok(99)), &[], 5, 3).await;
}

#[tokio::test]
async fn full_column_choice_falls_back_to_next_legal_column() {
    assert_bot_lands(ScriptedOpponent(Ok(3)), &[3, 3, 3], 5, 2).await;
}

#[tokio::test]
async fn forfeit_during_thinking_pause_stops_the_automated_reply() {
    let context = AppContext::with_repository(
        ServerConfig::for_tests().with_settings(GameSettings {
            matchmaking_timeout_ms: 50,
            grace_period_ms: 50,
            think_delay_ms: 400,
            ..GameSettings::default()
        }),
        Arc::new(DisabledRepository),
    )
    .expect("context");
    let mut telemetry = context.telemetry().subscribe();

    let (alice, mut alice_rx) = Connection::channel();
    let connection_id = alice.id();
    context.matchmaker().join("alice", alice).expect("alice joins");
    assert!(matches!(next_message(&mut alice_rx).await, ServerMessage::Waiting(_)));
    assert!(matches!(next_message(&mut alice_rx).await, ServerMessage::Start(_)));
    next_update(&mut alice_rx).await;
    let handle = context
        .registry()
        .find_active_by_participant("alice")
        .expect("active game");

    let pending = {
        let orchestrator = context.orchestrator();
        let handle = Arc::clone(&handle);
        tokio::spawn(async move { orchestrator.handle_move(&handle, "alice", 0).await })
    };
    next_update(&mut alice_rx).await;
    assert!(context
        .disconnects()
        .on_disconnect("alice", connection_id)
        .expect("disconnect"));

    assert_eq!(
        pending.await.expect("task").expect("handled"),
        TurnResult::Applied
    );

    let game = handle.snapshot().expect("snapshot");
    assert!(matches!(game.outcome(), Some(Outcome::Forfeit { .. })));
    assert_eq!(game.board().get(5, 0), Cell::Occupied(Color::One));
    let discs = (0..6)
        .flat_map(|row| (0..7).map(move |col| (row, col)))
        .filter(|&(row, col)| game.board().get(row, col) != Cell::Empty)
        .count();
    assert_eq!(discs, 1);

    let mut finished = 0;
    while let Ok(event) = telemetry.receiver.try_recv() {
        if event.event_type == EventType::GameFinished {
            finished += 1;
        }
    }
    assert_eq!(finished, 1);
}
