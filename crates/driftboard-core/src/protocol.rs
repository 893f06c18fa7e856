// Realtime wire format: flat JSON objects with a `type` discriminator.
//
// The live stream is a low-latency hint only. Delivery is best-effort and
// at-most-once; clients reconcile against the event log's `seq` after any
// gap or reconnect.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::UndoOutcome;
use crate::types::{Board, Comment, Task};

/// Messages the server pushes to board subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "board.created")]
    BoardCreated { board: Board },
    #[serde(rename = "board.updated")]
    BoardUpdated { board: Board },
    /// Deleting a board takes its event log with it, so this one is
    /// published live but never logged
    #[serde(rename = "board.deleted")]
    BoardDeleted { board_id: Uuid },
    #[serde(rename = "task.created")]
    TaskCreated { task: Task },
    #[serde(rename = "task.updated")]
    TaskUpdated { task: Task },
    #[serde(rename = "task.deleted")]
    TaskDeleted { task_id: Uuid },
    #[serde(rename = "comment.added")]
    CommentAdded { comment: Comment },
    #[serde(rename = "comment.updated")]
    CommentUpdated { comment: Comment },
    #[serde(rename = "comment.deleted")]
    CommentDeleted { comment_id: Uuid, task_id: Uuid },
    #[serde(rename = "undo")]
    Undo {
        event_id: Uuid,
        result: UndoOutcome,
    },
    #[serde(rename = "presence.join")]
    PresenceJoin {
        user_id: Uuid,
        name: Option<String>,
        avatar_url: Option<String>,
    },
    #[serde(rename = "presence.leave")]
    PresenceLeave { user_id: Uuid },
    #[serde(rename = "cursor")]
    Cursor {
        user_id: Uuid,
        name: Option<String>,
        x: f64,
        y: f64,
    },
    #[serde(rename = "pong")]
    Pong,
    /// Soft warning that the stream limiter dropped a message; the
    /// connection stays open
    #[serde(rename = "backpressure")]
    Backpressure { message: String },
}

/// Messages clients may send over the board socket
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
    Cursor { x: f64, y: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_is_flat_with_type_tag() {
        let msg = ServerMessage::PresenceLeave {
            user_id: Uuid::now_v7(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "presence.leave");
        assert!(value["user_id"].is_string());
    }

    #[test]
    fn test_pong_serializes_as_bare_type() {
        let value = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(value, json!({ "type": "pong" }));
    }

    #[test]
    fn test_client_cursor_parses() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "cursor", "x": 10.5, "y": -3.0 })).unwrap();
        assert_eq!(msg, ClientMessage::Cursor { x: 10.5, y: -3.0 });
    }

    #[test]
    fn test_unknown_client_message_is_an_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({ "type": "shout", "text": "hi" }));
        assert!(result.is_err());
    }
}
