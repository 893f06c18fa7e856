// The board event tagged union.
//
// Events are stored with a `type` discriminator column plus a JSON payload
// column, but in code the two are one enum: adding a mutation type forces an
// explicit decision about how (or whether) undo inverts it. Payloads carry
// exactly what inversion needs: `created` events the new id, `deleted` events
// the full prior snapshot, `updated` events both the patch and the snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{BoardPatch, BoardSnapshot, CommentSnapshot, TaskPatch, TaskSnapshot};

/// Everything that can be appended to a board's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventBody {
    #[serde(rename = "board.created")]
    BoardCreated { board_id: Uuid },
    #[serde(rename = "board.updated")]
    BoardUpdated {
        board_id: Uuid,
        patch: BoardPatch,
        previous: BoardSnapshot,
    },
    #[serde(rename = "task.created")]
    TaskCreated { task_id: Uuid },
    #[serde(rename = "task.updated")]
    TaskUpdated {
        task_id: Uuid,
        patch: TaskPatch,
        previous: TaskSnapshot,
    },
    #[serde(rename = "task.deleted")]
    TaskDeleted { task: TaskSnapshot },
    #[serde(rename = "comment.added")]
    CommentAdded { comment_id: Uuid },
    #[serde(rename = "comment.updated")]
    CommentUpdated {
        comment_id: Uuid,
        content: String,
        previous_content: String,
    },
    #[serde(rename = "comment.deleted")]
    CommentDeleted { comment: CommentSnapshot },
    /// Corrective event appended by the undo engine; references the event it
    /// undid and records the concrete action taken
    #[serde(rename = "undo")]
    Undo {
        undone_event_id: Uuid,
        action: UndoOutcome,
    },
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("event payload is not a JSON object")]
    NotAnObject,
    #[error("unknown or malformed event `{event_type}`: {source}")]
    Malformed {
        event_type: String,
        source: serde_json::Error,
    },
}

impl EventBody {
    /// The discriminator stored in the `type` column
    pub fn event_type(&self) -> &'static str {
        match self {
            EventBody::BoardCreated { .. } => "board.created",
            EventBody::BoardUpdated { .. } => "board.updated",
            EventBody::TaskCreated { .. } => "task.created",
            EventBody::TaskUpdated { .. } => "task.updated",
            EventBody::TaskDeleted { .. } => "task.deleted",
            EventBody::CommentAdded { .. } => "comment.added",
            EventBody::CommentUpdated { .. } => "comment.updated",
            EventBody::CommentDeleted { .. } => "comment.deleted",
            EventBody::Undo { .. } => "undo",
        }
    }

    /// Split into the stored `(type, payload)` pair. The payload object does
    /// not repeat the discriminator.
    pub fn to_parts(&self) -> (&'static str, serde_json::Value) {
        let mut value = serde_json::to_value(self)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
        if let Some(obj) = value.as_object_mut() {
            obj.remove("type");
        }
        (self.event_type(), value)
    }

    /// Rebuild an event body from the stored `type` and `payload` columns
    pub fn from_parts(
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<Self, EventParseError> {
        let mut obj = payload
            .as_object()
            .cloned()
            .ok_or(EventParseError::NotAnObject)?;
        obj.insert(
            "type".to_string(),
            serde_json::Value::String(event_type.to_string()),
        );
        serde_json::from_value(serde_json::Value::Object(obj)).map_err(|source| {
            EventParseError::Malformed {
                event_type: event_type.to_string(),
                source,
            }
        })
    }
}

/// Tagged result of an undo or redo, published to subscribers so they can
/// apply a local patch (or re-fetch by id) without a full resync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoOutcome {
    TaskDeleted { task_id: Uuid },
    TaskRestored { task_id: Uuid },
    TaskReverted { task_id: Uuid },
    CommentDeleted { comment_id: Uuid },
    CommentRestored { comment_id: Uuid },
    CommentReverted { comment_id: Uuid },
    BoardReverted { board_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_payload_carries_only_the_id() {
        let task_id = Uuid::now_v7();
        let (event_type, payload) = EventBody::TaskCreated { task_id }.to_parts();

        assert_eq!(event_type, "task.created");
        assert_eq!(payload, json!({ "task_id": task_id }));
    }

    #[test]
    fn test_deleted_round_trips_through_parts() {
        let body = EventBody::TaskDeleted {
            task: TaskSnapshot {
                id: Uuid::now_v7(),
                board_id: Uuid::now_v7(),
                title: "ship it".to_string(),
                status: "open".to_string(),
                assigned_to: vec![],
                details: Some(json!({ "position": { "x": 4, "y": 2 } })),
                created_by: None,
            },
        };

        let (event_type, payload) = body.to_parts();
        let parsed = EventBody::from_parts(event_type, &payload).unwrap();

        assert_eq!(parsed, body);
    }

    #[test]
    fn test_undo_event_references_the_original() {
        let original = Uuid::now_v7();
        let task_id = Uuid::now_v7();
        let body = EventBody::Undo {
            undone_event_id: original,
            action: UndoOutcome::TaskDeleted { task_id },
        };

        let (event_type, payload) = body.to_parts();
        assert_eq!(event_type, "undo");
        assert_eq!(payload["undone_event_id"], json!(original));
        assert_eq!(payload["action"]["type"], "task_deleted");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = EventBody::from_parts("task.exploded", &json!({})).unwrap_err();
        assert!(matches!(err, EventParseError::Malformed { .. }));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = EventBody::from_parts("task.created", &json!("nope")).unwrap_err();
        assert!(matches!(err, EventParseError::NotAnObject));
    }

    #[test]
    fn test_undo_outcome_wire_tags() {
        let outcome = UndoOutcome::CommentRestored {
            comment_id: Uuid::now_v7(),
        };
        let value = serde_json::to_value(outcome).unwrap();
        assert_eq!(value["type"], "comment_restored");
    }
}
