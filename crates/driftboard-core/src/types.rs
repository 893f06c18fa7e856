// Public domain DTOs shared by the API, storage, and realtime crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================
// Users
// ============================================

/// Author info attached to events and presence messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

// ============================================
// Boards
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable board fields captured before an update, so the update event can
/// be inverted without extra storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoardSnapshot {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================
// Tasks
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub status: String,
    pub assigned_to: Vec<Uuid>,
    /// Free-form task configuration (position, tags, content) owned by the UI
    pub details: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full prior state of a task's mutable fields, carried in `task.deleted`
/// payloads and as `previous` in `task.updated` payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub status: String,
    pub assigned_to: Vec<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            board_id: task.board_id,
            title: task.title.clone(),
            status: task.status.clone(),
            assigned_to: task.assigned_to.clone(),
            details: task.details.clone(),
            created_by: task.created_by,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.details.is_none()
    }
}

// ============================================
// Comments
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentSnapshot {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

impl From<&Comment> for CommentSnapshot {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            task_id: comment.task_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
        }
    }
}

// ============================================
// Events (public, author-enriched form)
// ============================================

/// One immutable log record as returned by the events API. `seq` is the
/// per-board ordering authority; `payload` keeps the raw JSON so clients can
/// replay without knowing every variant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoardEvent {
    pub id: Uuid,
    pub board_id: Uuid,
    pub seq: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}
