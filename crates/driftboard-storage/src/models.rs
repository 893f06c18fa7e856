// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use driftboard_core::types::{Board, Comment, Task};

// ============================================
// Auth models (verification only; issuance is external)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================
// Board models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct BoardRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BoardRow> for Board {
    fn from(row: BoardRow) -> Self {
        Board {
            id: row.id,
            name: row.name,
            description: row.description,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBoard {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
}

// ============================================
// Task models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub status: String,
    pub assigned_to: Vec<Uuid>,
    pub details: Option<sqlx::types::JsonValue>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            board_id: row.board_id,
            title: row.title,
            status: row.status,
            assigned_to: row.assigned_to,
            details: row.details,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub board_id: Uuid,
    pub title: String,
    pub status: Option<String>,
    pub assigned_to: Vec<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
}

// ============================================
// Comment models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            task_id: row.task_id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

// ============================================
// Event models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct BoardEventRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub seq: i64,
    pub event_type: String,
    pub payload: sqlx::types::JsonValue,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Event row joined with its author for replay responses
#[derive(Debug, Clone, FromRow)]
pub struct BoardEventWithAuthorRow {
    pub id: Uuid,
    pub board_id: Uuid,
    pub seq: i64,
    pub event_type: String,
    pub payload: sqlx::types::JsonValue,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

/// What `append` hands back to the enclosing transaction
#[derive(Debug, Clone, Copy, FromRow)]
pub struct AppendedEvent {
    pub id: Uuid,
    pub seq: i64,
}
