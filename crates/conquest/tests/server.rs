//! Integration tests for the Conquest server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use conquest::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// One question, option 0 is right, so every round is predictable.
fn one_question_bank() -> Arc<QuestionBank> {
    Arc::new(
        QuestionBank::new(vec![Question::new("2+2*2=?", &["6", "8", "4"], 0)])
            .expect("valid bank"),
    )
}

/// Starts a server on a random port and returns the address.
async fn start_server_with(game: GameConfig, session: SessionConfig) -> String {
    let server = ConquestServer::builder()
        .bind("127.0.0.1:0")
        .game_config(game)
        .session_config(session)
        .question_bank(one_question_bank())
        .build(DevTokenAuthenticator)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn start_server() -> String {
    start_server_with(GameConfig::default(), SessionConfig::default()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("client send");
}

/// Next JSON frame, or `None` once the server closed the socket.
async fn try_recv(ws: &mut ClientWs) -> Option<Value> {
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("server should answer in time");
    match next {
        Some(Ok(Message::Text(text))) => {
            Some(serde_json::from_str(text.as_str()).expect("server sends JSON"))
        }
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => None,
        Some(Ok(other)) => panic!("unexpected frame {other:?}"),
    }
}

async fn recv(ws: &mut ClientWs) -> Value {
    try_recv(ws).await.expect("connection should stay open")
}

/// Skips frames until one of `kind` arrives.
async fn recv_type(ws: &mut ClientWs, kind: &str) -> Value {
    loop {
        let msg = recv(ws).await;
        if msg["type"] == kind {
            return msg;
        }
    }
}

/// Skips frames until the ack for request `id` arrives.
async fn recv_ack(ws: &mut ClientWs, id: u64) -> Value {
    loop {
        let msg = recv_type(ws, "ack").await;
        if msg["id"] == id {
            return msg;
        }
    }
}

/// Sends `command` as request `id` and returns its ack.
async fn request(ws: &mut ClientWs, id: u64, command: Value) -> Value {
    send(ws, json!({"id": id, "command": command})).await;
    recv_ack(ws, id).await
}

/// Skips frames until a `room:update` whose phase is `phase`.
async fn recv_phase(ws: &mut ClientWs, phase: &str) -> Value {
    loop {
        let msg = recv_type(ws, "room:update").await;
        if msg["room"]["state"]["phase"] == phase {
            return msg;
        }
    }
}

async fn hello(ws: &mut ClientWs, token: &str) -> Value {
    send(
        ws,
        json!({"id": 0, "command": {"type": "hello", "version": PROTOCOL_VERSION, "token": token}}),
    )
    .await;
    recv(ws).await
}

/// Connects and completes the handshake.
async fn player(addr: &str, token: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    let welcome = hello(&mut ws, token).await;
    assert_eq!(welcome["type"], "welcome", "handshake failed: {welcome}");
    ws
}

/// alice (1) hosts, bob (2) joins; returns both sockets and the room code.
async fn two_player_room(addr: &str) -> (ClientWs, ClientWs, String) {
    let mut alice = player(addr, "1:alice").await;
    let mut bob = player(addr, "2:bob").await;

    let ack = request(&mut alice, 1, json!({"type": "room:create", "name": "Quiz"})).await;
    assert_eq!(ack["ok"], true, "{ack}");
    let code = ack["room"]["id"].as_str().expect("room code").to_string();

    let ack = request(&mut bob, 1, json!({"type": "room:join", "roomCode": code})).await;
    assert_eq!(ack["ok"], true, "{ack}");
    (alice, bob, code)
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_success() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let welcome = hello(&mut ws, "7:alice").await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["playerId"], 7);
    assert!(welcome["serverTime"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_handshake_wrong_version() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        json!({"id": 0, "command": {"type": "hello", "version": 999, "token": "1:alice"}}),
    )
    .await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["code"], 400);
    assert!(msg["message"].as_str().unwrap().contains("version"));
}

#[tokio::test]
async fn test_handshake_bad_token() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let msg = hello(&mut ws, "not-a-token").await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["code"], 401);
}

#[tokio::test]
async fn test_handshake_missing_token() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"command": {"type": "hello", "version": 1}})).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["code"], 401);
}

#[tokio::test]
async fn test_first_message_must_be_hello() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({"id": 1, "command": {"type": "room:list"}})).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["code"], 400);
    assert!(try_recv(&mut ws).await.is_none(), "connection should close");
}

#[tokio::test]
async fn test_duplicate_identity_rejected() {
    let addr = start_server().await;
    let _first = player(&addr, "5:alice").await;

    let mut second = connect(&addr).await;
    let msg = hello(&mut second, "5:alice").await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["code"], 409);
}

#[tokio::test]
async fn test_identity_is_free_again_after_disconnect() {
    let addr = start_server().await;
    let mut first = player(&addr, "5:alice").await;
    first.close(None).await.expect("close");
    drop(first);

    // cleanup runs in a spawned task
    let mut welcome = Value::Null;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        let mut again = connect(&addr).await;
        welcome = hello(&mut again, "5:alice").await;
        if welcome["type"] == "welcome" {
            break;
        }
    }
    assert_eq!(welcome["type"], "welcome");
}

#[tokio::test]
async fn test_handshake_timeout_closes_connection() {
    let session = SessionConfig {
        handshake_timeout: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let addr = start_server_with(GameConfig::default(), session).await;
    let mut ws = connect(&addr).await;

    assert!(try_recv(&mut ws).await.is_none());
}

// =========================================================================
// Connection-level messages
// =========================================================================

#[tokio::test]
async fn test_ping_pong() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    send(&mut ws, json!({"id": 9, "command": {"type": "ping", "clientTime": 12345}})).await;
    let pong = recv(&mut ws).await;
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["clientTime"], 12345);
    assert!(pong["serverTime"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_garbage_frame_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    ws.send(Message::text("{not json")).await.unwrap();
    let msg = recv(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["code"], 400);

    send(&mut ws, json!({"id": 1, "command": {"type": "warp:drive"}})).await;
    let msg = recv(&mut ws).await;
    assert_eq!(msg["code"], 400);

    let ack = request(&mut ws, 2, json!({"type": "room:list"})).await;
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_malformed_room_code_is_acked_as_not_found() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(&mut ws, 7, json!({"type": "room:join", "roomCode": "AB-CD"})).await;
    assert_eq!(ack["ok"], false);
    assert_eq!(ack["error"], "room AB-CD not found");

    let long = "A".repeat(17);
    let ack = request(&mut ws, 8, json!({"type": "room:join", "roomCode": long})).await;
    assert_eq!(ack["ok"], false);
    assert!(ack["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_command_with_bad_field_is_rejected_in_its_ack() {
    let addr = start_server().await;
    let (mut alice, _bob, code) = two_player_room(&addr).await;
    request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;

    let ack = request(
        &mut alice,
        8,
        json!({"type": "game:answer", "roomId": code, "answerIndex": -1}),
    )
    .await;
    assert_eq!(ack["ok"], false);
    assert!(ack["error"].as_str().unwrap().contains("game:answer"));

    // the connection keeps working
    let ack = request(
        &mut alice,
        9,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_second_hello_is_rejected_in_ack() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(
        &mut ws,
        3,
        json!({"type": "hello", "version": 1, "token": "1:alice"}),
    )
    .await;
    assert_eq!(ack["ok"], false);
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let session = SessionConfig {
        idle_timeout: Duration::from_millis(100),
        ..SessionConfig::default()
    };
    let addr = start_server_with(GameConfig::default(), session).await;
    let mut ws = player(&addr, "1:alice").await;

    assert!(try_recv(&mut ws).await.is_none());
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_acks_with_view() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(&mut ws, 1, json!({"type": "room:create", "name": "Friday quiz"})).await;
    assert_eq!(ack["ok"], true);
    let room = &ack["room"];
    assert_eq!(room["name"], "Friday quiz");
    assert_eq!(room["hostId"], 1);
    assert_eq!(room["players"][0]["name"], "alice");
    assert_eq!(room["state"]["phase"], "lobby");
    assert_eq!(room["id"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn test_join_unknown_room() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(&mut ws, 1, json!({"type": "room:join", "roomCode": "ZZZZ"})).await;
    assert_eq!(ack["ok"], false);
    assert_eq!(ack["error"], "room ZZZZ not found");
}

#[tokio::test]
async fn test_join_broadcasts_update_to_host() {
    let addr = start_server().await;
    let (mut alice, _bob, _code) = two_player_room(&addr).await;

    loop {
        let update = recv_type(&mut alice, "room:update").await;
        if update["room"]["players"].as_array().unwrap().len() == 2 {
            assert_eq!(update["room"]["players"][1]["name"], "bob");
            break;
        }
    }
}

#[tokio::test]
async fn test_join_accepts_lowercase_code() {
    let addr = start_server().await;
    let mut alice = player(&addr, "1:alice").await;
    let mut bob = player(&addr, "2:bob").await;

    let ack = request(&mut alice, 1, json!({"type": "room:create", "name": ""})).await;
    let code = ack["room"]["id"].as_str().unwrap().to_lowercase();
    assert_eq!(ack["room"]["name"], "alice's room");

    let ack = request(&mut bob, 1, json!({"type": "room:join", "roomCode": code})).await;
    assert_eq!(ack["ok"], true, "{ack}");
}

#[tokio::test]
async fn test_list_rooms() {
    let addr = start_server().await;
    let (mut alice, _bob, code) = two_player_room(&addr).await;

    let ack = request(&mut alice, 2, json!({"type": "room:list"})).await;
    let rooms = ack["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], code.as_str());
    assert_eq!(rooms[0]["playerCount"], 2);
    assert_eq!(rooms[0]["phase"], "lobby");
}

#[tokio::test]
async fn test_leave_room_is_ok_even_when_not_in_one() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(&mut ws, 1, json!({"type": "room:leave"})).await;
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let addr = start_server().await;
    let (mut alice, mut bob, _code) = two_player_room(&addr).await;
    // drain the join update
    recv_type(&mut alice, "room:update").await;

    bob.close(None).await.expect("close");
    drop(bob);

    loop {
        let update = recv_type(&mut alice, "room:update").await;
        if update["room"]["players"].as_array().unwrap().len() == 1 {
            assert_eq!(update["room"]["players"][0]["id"], 1);
            break;
        }
    }
}

#[tokio::test]
async fn test_host_migrates_when_host_leaves() {
    let addr = start_server().await;
    let (mut alice, mut bob, _code) = two_player_room(&addr).await;

    let ack = request(&mut alice, 2, json!({"type": "room:leave"})).await;
    assert_eq!(ack["ok"], true);

    loop {
        let update = recv_type(&mut bob, "room:update").await;
        if update["room"]["players"].as_array().unwrap().len() == 1 {
            assert_eq!(update["room"]["hostId"], 2);
            break;
        }
    }
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_start_requires_host_and_players() {
    let addr = start_server().await;
    let mut alice = player(&addr, "1:alice").await;

    let ack = request(&mut alice, 1, json!({"type": "room:create", "name": "Solo"})).await;
    let code = ack["room"]["id"].as_str().unwrap().to_string();

    let ack = request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;
    assert_eq!(ack["ok"], false);

    let mut bob = player(&addr, "2:bob").await;
    request(&mut bob, 1, json!({"type": "room:join", "roomCode": code})).await;

    let ack = request(&mut bob, 2, json!({"type": "game:start", "roomId": code})).await;
    assert_eq!(ack["ok"], false, "only the host may start");

    let ack = request(&mut alice, 3, json!({"type": "game:start", "roomId": code})).await;
    assert_eq!(ack["ok"], true, "{ack}");
}

#[tokio::test]
async fn test_picks_stay_hidden_until_resolve() {
    let addr = start_server().await;
    let (mut alice, mut bob, code) = two_player_room(&addr).await;
    request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;

    let ack = request(
        &mut alice,
        3,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true);

    let answered = loop {
        let update = recv_phase(&mut bob, "question").await;
        let answer = &update["room"]["state"]["answers"]["1"];
        if !answer.is_null() {
            break answer.clone();
        }
    };
    assert!(answered["submittedAt"].as_u64().is_some());
    assert!(answered.get("index").is_none(), "pick leaked: {answered}");

    request(&mut bob, 3, json!({"type": "game:resolve", "roomId": code})).await;
    let update = recv_phase(&mut bob, "claim").await;
    assert_eq!(update["room"]["state"]["answers"]["1"]["index"], 0);
}

#[tokio::test]
async fn test_full_round_flow() {
    let addr = start_server().await;
    let (mut alice, mut bob, code) = two_player_room(&addr).await;

    let ack = request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;
    assert_eq!(ack["ok"], true, "{ack}");

    let update = recv_phase(&mut bob, "question").await;
    let state = &update["room"]["state"];
    assert_eq!(state["question"]["prompt"], "2+2*2=?");
    assert!(state["question"].get("correct").is_none(), "answer must stay hidden");
    assert!(state["deadline"].as_u64().is_some());

    // alice answers first, both correct
    let ack = request(
        &mut alice,
        3,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true);
    let ack = request(
        &mut bob,
        3,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true);

    let ack = request(&mut bob, 4, json!({"type": "game:resolve", "roomId": code})).await;
    assert_eq!(ack["ok"], true);

    let correcters = recv_type(&mut alice, "game:correcters").await;
    assert_eq!(correcters["roomId"], code.as_str());
    assert_eq!(correcters["userIds"], json!([1, 2]));
    assert_eq!(correcters["correctIndex"], 0);

    let update = recv_phase(&mut alice, "claim").await;
    assert_eq!(update["room"]["state"]["turnPlayer"], 1);

    // bob is not on turn
    let ack = request(
        &mut bob,
        5,
        json!({"type": "game:claim", "roomId": code, "x": 0, "y": 0}),
    )
    .await;
    assert_eq!(ack["ok"], false);

    let ack = request(
        &mut alice,
        4,
        json!({"type": "game:claim", "roomId": code, "x": 0, "y": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true, "{ack}");

    let update = recv_phase(&mut bob, "question").await;
    let state = &update["room"]["state"];
    assert_eq!(state["grid"][0][0]["owner"], 1);
    assert_eq!(state["grid"][0][0]["strength"], 1);
    assert_eq!(state["claimed"]["1"], 1);
}

#[tokio::test]
async fn test_resolve_with_nobody_correct_reopens_question() {
    let addr = start_server().await;
    let (mut alice, mut bob, code) = two_player_room(&addr).await;

    request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;
    request(
        &mut bob,
        2,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 2}),
    )
    .await;
    let ack = request(&mut alice, 3, json!({"type": "game:resolve", "roomId": code})).await;
    assert_eq!(ack["ok"], true);

    let correcters = recv_type(&mut bob, "game:correcters").await;
    assert_eq!(correcters["userIds"], json!([]));

    let ack = request(&mut alice, 4, json!({"type": "room:list"})).await;
    assert_eq!(ack["rooms"][0]["phase"], "question");
}

#[tokio::test]
async fn test_claim_out_of_bounds_is_reported_in_ack() {
    let addr = start_server().await;
    let (mut alice, mut bob, code) = two_player_room(&addr).await;

    request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;
    request(
        &mut alice,
        3,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    request(&mut bob, 2, json!({"type": "game:resolve", "roomId": code})).await;

    let ack = request(
        &mut alice,
        4,
        json!({"type": "game:claim", "roomId": code, "x": 99, "y": -1}),
    )
    .await;
    assert_eq!(ack["ok"], false);

    // still alice's turn after the bad claim
    let ack = request(
        &mut alice,
        5,
        json!({"type": "game:claim", "roomId": code, "x": 1, "y": 1}),
    )
    .await;
    assert_eq!(ack["ok"], true, "{ack}");
}

#[tokio::test]
async fn test_game_command_for_unknown_room() {
    let addr = start_server().await;
    let mut ws = player(&addr, "1:alice").await;

    let ack = request(&mut ws, 1, json!({"type": "game:start", "roomId": "QQQQ"})).await;
    assert_eq!(ack["ok"], false);
    assert_eq!(ack["error"], "room QQQQ not found");
}

#[tokio::test]
async fn test_game_on_one_cell_board_ends_after_first_claim() {
    let game = GameConfig {
        grid_size: 1,
        ..GameConfig::default()
    };
    let addr = start_server_with(game, SessionConfig::default()).await;
    let (mut alice, mut bob, code) = two_player_room(&addr).await;

    request(&mut alice, 2, json!({"type": "game:start", "roomId": code})).await;
    request(
        &mut bob,
        2,
        json!({"type": "game:answer", "roomId": code, "answerIndex": 0}),
    )
    .await;
    request(&mut alice, 3, json!({"type": "game:resolve", "roomId": code})).await;
    let ack = request(
        &mut bob,
        3,
        json!({"type": "game:claim", "roomId": code, "x": 0, "y": 0}),
    )
    .await;
    assert_eq!(ack["ok"], true, "{ack}");

    let update = recv_phase(&mut alice, "end").await;
    assert_eq!(update["room"]["state"]["grid"][0][0]["owner"], 2);

    // the host can start a rematch from the end phase
    let ack = request(&mut alice, 4, json!({"type": "game:start", "roomId": code})).await;
    assert_eq!(ack["ok"], true, "{ack}");
}
