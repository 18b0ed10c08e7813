//! Per-connection handler: handshake, command dispatch, and delivery of
//! room events.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `hello` → validate version, authenticate token
//!   2. Register the session → send `welcome`
//!   3. Loop: decode frames → dispatch commands → ack; forward room events.
//!      A known command with bad fields is still rejected in its ack
//!   4. On close or idle timeout the guard takes the player out of their
//!      room and drops the session

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use conquest_protocol::{
    ClientFrame, Codec, Command, FrameHeader, PROTOCOL_VERSION, PlayerId, ProtocolError,
    RoomSummary, RoomView, ServerMessage,
};
use conquest_room::{PlayerSender, RoomError, RoomOutbound};
use conquest_session::{Authenticator, UserProfile};
use conquest_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::ConquestError;
use crate::server::ServerState;

/// Drop guard that takes the player out of their room and removes their
/// session when the handler exits, including by panic.
///
/// `Drop` is synchronous, so the async cleanup runs in a spawned task.
struct SessionGuard<A: Authenticator, C: Codec> {
    player_id: PlayerId,
    connection: ConnectionId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for SessionGuard<A, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // Leave before releasing the session: a reconnect is refused
            // until the session is gone, so it cannot race this leave.
            if let Err(e) = state.rooms.lock().await.leave_room(player_id).await {
                tracing::debug!(%player_id, error = %e, "leave on disconnect failed");
            }
            let removed = state
                .sessions
                .lock()
                .await
                .remove_if_connection(player_id, connection);
            if let Err(e) = removed {
                tracing::debug!(%player_id, %connection, error = %e, "session already gone");
            }
        });
    }
}

/// What the connection knows about its player once the handshake is done.
struct Player {
    id: PlayerId,
    name: String,
    /// Handed to every room the player enters.
    events: PlayerSender,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), ConquestError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    let profile = perform_handshake(&conn, &state).await?;
    let player_id = profile.id;
    let name = profile.name.clone();

    // --- Step 2: Session ---
    let (idle_timeout, created) = {
        let mut sessions = state.sessions.lock().await;
        let idle = sessions.config().idle_timeout;
        (idle, sessions.create(profile, conn_id).map(|_| ()))
    };
    if let Err(e) = created {
        send_error(&conn, &state.codec, 409, &e.to_string()).await?;
        return Err(e.into());
    }
    let _guard = SessionGuard {
        player_id,
        connection: conn_id,
        state: Arc::clone(&state),
    };

    send_message(
        &conn,
        &state.codec,
        &ServerMessage::Welcome {
            player_id,
            server_time: epoch_ms(),
        },
    )
    .await?;
    tracing::info!(%conn_id, %player_id, %name, "player connected");

    // --- Step 3: Message loop ---
    let (events, mut outbound) = mpsc::unbounded_channel();
    let player = Player {
        id: player_id,
        name,
        events,
    };

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(Instant::now() + idle_timeout);

                let frame: ClientFrame = match state.codec.decode(&data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode frame");
                        let reply = match state.codec.decode::<FrameHeader>(&data) {
                            Ok(header) if header.expects_ack() => ServerMessage::ack_err(
                                header.id,
                                format!("invalid {}: {e}", header.command.kind),
                            ),
                            _ => ServerMessage::Error {
                                code: 400,
                                message: e.to_string(),
                            },
                        };
                        send_message(&conn, &state.codec, &reply).await?;
                        continue;
                    }
                };

                let reply = dispatch(&state, &player, frame).await;
                send_message(&conn, &state.codec, &reply).await?;
            }

            Some(event) = outbound.recv() => {
                send_message(&conn, &state.codec, &event_message(event)).await?;
            }

            () = &mut idle => {
                tracing::info!(%player_id, ?idle_timeout, "connection idle, dropping");
                break;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → room leave + session removal.
    Ok(())
}

/// Receives `hello`, checks version and token, and returns the profile.
///
/// Violations are answered with an `error` frame (400 bad handshake,
/// 401 unauthorized) before the connection is dropped.
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, C>>,
) -> Result<UserProfile, ConquestError>
where
    A: Authenticator,
    C: Codec,
{
    let timeout = state.sessions.lock().await.config().handshake_timeout;

    let data = match tokio::time::timeout(timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(ConquestError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let (version, token) = match state.codec.decode::<ClientFrame>(&data) {
        Ok(ClientFrame {
            command: Command::Hello { version, token },
            ..
        }) => (version, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected hello").await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be hello".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let token = token.as_deref().unwrap_or("");
    match state.auth.authenticate(token).await {
        Ok(profile) => Ok(profile),
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "handshake rejected");
            send_error(conn, &state.codec, 401, "unauthorized").await?;
            Err(e.into())
        }
    }
}

/// Runs one command and builds the frame that answers it: an `ack`
/// carrying the request id, or `pong` for `ping`.
async fn dispatch<A, C>(
    state: &Arc<ServerState<A, C>>,
    player: &Player,
    frame: ClientFrame,
) -> ServerMessage
where
    A: Authenticator,
    C: Codec,
{
    let id = frame.id;
    let kind = frame.command.kind();

    let result: Result<Reply, RoomError> = match frame.command {
        Command::Ping { client_time } => {
            return ServerMessage::Pong {
                client_time,
                server_time: epoch_ms(),
            };
        }

        Command::Hello { .. } => {
            return ServerMessage::ack_err(id, "already connected");
        }

        Command::CreateRoom { name } => state
            .rooms
            .lock()
            .await
            .create_room(player.id, &player.name, &name, player.events.clone())
            .await
            .map(Reply::Room),

        Command::JoinRoom { room_code } => state
            .rooms
            .lock()
            .await
            .join_room(player.id, &player.name, &room_code, player.events.clone())
            .await
            .map(Reply::Room),

        Command::LeaveRoom => state
            .rooms
            .lock()
            .await
            .leave_room(player.id)
            .await
            .map(|()| Reply::Done),

        Command::ListRooms => {
            let rooms = state.rooms.lock().await.list_rooms().await;
            Ok(Reply::Rooms(rooms))
        }

        // Game commands only need one room: clone its handle and release
        // the registry before waiting on the actor.
        Command::StartGame { room_id } => {
            let room = state.rooms.lock().await.room(&room_id);
            match room {
                Ok(room) => room.start(player.id).await.map(|()| Reply::Done),
                Err(e) => Err(e),
            }
        }

        Command::SubmitAnswer {
            room_id,
            answer_index,
        } => {
            let room = state.rooms.lock().await.room(&room_id);
            match room {
                Ok(room) => room
                    .answer(player.id, answer_index)
                    .await
                    .map(|()| Reply::Done),
                Err(e) => Err(e),
            }
        }

        Command::ResolveRound { room_id } => {
            let room = state.rooms.lock().await.room(&room_id);
            match room {
                Ok(room) => room.resolve(player.id).await.map(|()| Reply::Done),
                Err(e) => Err(e),
            }
        }

        Command::Claim { room_id, x, y } => {
            let room = state.rooms.lock().await.room(&room_id);
            match room {
                Ok(room) => room.claim(player.id, x, y).await.map(|()| Reply::Done),
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(Reply::Done) => ServerMessage::ack_ok(id),
        Ok(Reply::Room(view)) => ServerMessage::ack_room(id, view),
        Ok(Reply::Rooms(rooms)) => ServerMessage::ack_rooms(id, rooms),
        Err(e) => {
            tracing::debug!(player_id = %player.id, command = kind, error = %e, "command rejected");
            ServerMessage::ack_err(id, e.to_string())
        }
    }
}

/// Payload of a successful ack.
enum Reply {
    Done,
    Room(RoomView),
    Rooms(Vec<RoomSummary>),
}

fn event_message(event: RoomOutbound) -> ServerMessage {
    match event {
        RoomOutbound::Update(room) => ServerMessage::RoomUpdate { room },
        RoomOutbound::Correcters {
            room,
            winners,
            correct_index,
        } => ServerMessage::Correcters {
            room_id: room,
            user_ids: winners,
            correct_index,
        },
    }
}

async fn send_message(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &ServerMessage,
) -> Result<(), ConquestError> {
    let bytes = codec.encode(message)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` frame to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
) -> Result<(), ConquestError> {
    send_message(
        conn,
        codec,
        &ServerMessage::Error {
            code,
            message: message.to_string(),
        },
    )
    .await
}

/// Wall-clock milliseconds since the Unix epoch.
fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
