// Board WebSocket gateway.
//
// One socket per (board, connection). Auth and membership are checked
// before the upgrade completes; after that the connection is registered
// with the broadcast hub and presence tracker, and torn down in reverse
// order when either side closes.

use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use driftboard_core::{constants::CURSOR_THROTTLE, ClientMessage, ServerMessage};
use driftboard_realtime::{ConnectionHandle, UserInfo};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub board_id: Uuid,
    /// Bearer token; browsers cannot set headers on WS upgrades
    pub token: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(board_socket))
        .with_state(state)
}

/// GET /ws?board_id=...&token=... - Upgrade to the board's live stream
pub async fn board_socket(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user_id = state
        .db
        .get_user_id_by_token(&query.token)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    state.require_member(query.board_id, user_id).await?;

    let board_id = query.board_id;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, board_id, user_id)))
}

async fn handle_socket(state: AppState, socket: WebSocket, board_id: Uuid, user_id: Uuid) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let info = match state.db.get_user(user_id).await {
        Ok(Some(user)) => UserInfo {
            name: user.name,
            avatar_url: user.avatar_url,
        },
        Ok(None) => UserInfo::default(),
        Err(err) => {
            tracing::error!(user_id = %user_id, "failed to load user for presence: {}", err);
            UserInfo::default()
        }
    };

    let (conn, mut outbox) = ConnectionHandle::new(board_id, user_id);
    let conn_id = conn.id;
    let handle = conn.clone();

    // Drain the connection's outbox into the socket. Exits when the hub
    // drops the handle or the socket closes.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Roster snapshot (itself included) goes out before the connection is
    // registered for fan-out, so it is always the first payload received.
    let first_for_user = state
        .presence
        .connect(board_id, user_id, conn_id, info.clone());
    for (present_user, present_info) in state.presence.snapshot(board_id) {
        handle.send(&ServerMessage::PresenceJoin {
            user_id: present_user,
            name: present_info.name,
            avatar_url: present_info.avatar_url,
        });
    }
    state.hub.subscribe(conn);
    if first_for_user {
        state.hub.publish(
            board_id,
            &ServerMessage::PresenceJoin {
                user_id,
                name: info.name.clone(),
                avatar_url: info.avatar_url.clone(),
            },
        );
    }

    tracing::debug!(board_id = %board_id, user_id = %user_id, conn_id = %conn_id, "ws connected");

    let mut last_cursor: Option<Instant> = None;
    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if !state.stream_limiter.check(conn_id) {
            handle.send(&ServerMessage::Backpressure {
                message: "message rate exceeded, dropped".to_string(),
            });
            continue;
        }

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => {
                handle.send(&ServerMessage::Pong);
            }
            Ok(ClientMessage::Cursor { x, y }) => {
                // Per-connection throttle on top of the window limiter;
                // intermediate positions are droppable hints
                if last_cursor.is_some_and(|at| at.elapsed() < CURSOR_THROTTLE) {
                    continue;
                }
                last_cursor = Some(Instant::now());
                state.hub.publish(
                    board_id,
                    &ServerMessage::Cursor {
                        user_id,
                        name: info.name.clone(),
                        x,
                        y,
                    },
                );
            }
            Err(err) => {
                tracing::debug!(conn_id = %conn_id, "ignoring malformed client message: {}", err);
            }
        }
    }

    // Teardown mirrors setup: presence first so the leave can still be
    // published, then the hub registration, then the limiter window.
    if state.presence.disconnect(board_id, user_id, conn_id) {
        state
            .hub
            .publish(board_id, &ServerMessage::PresenceLeave { user_id });
    }
    state.hub.unsubscribe(board_id, conn_id);
    state.stream_limiter.clear(conn_id);
    writer.abort();

    tracing::debug!(board_id = %board_id, conn_id = %conn_id, "ws disconnected");
}
