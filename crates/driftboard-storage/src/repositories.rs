// Repository layer for database operations.
//
// Reads run on the pool; every mutating method takes the caller's transaction
// so the domain write and its event log append commit or abort together. The
// undo paths (`overwrite_task`, `restore_task`, `delete_*`) report affected
// rows instead of erroring, so racing inverses fail closed as no-ops.

use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use driftboard_core::types::{BoardPatch, BoardSnapshot, CommentSnapshot, TaskPatch, TaskSnapshot};

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Users and sessions (token verification only)
    // ============================================

    pub async fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, avatar_url, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Resolve a bearer token to its user, honoring expiry
    pub async fn get_user_id_by_token(&self, token: &str) -> Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM auth_sessions
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id,)| user_id))
    }

    // ============================================
    // Boards and membership
    // ============================================

    pub async fn create_board(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: CreateBoard,
    ) -> Result<BoardRow> {
        let row = sqlx::query_as::<_, BoardRow>(
            r#"
            INSERT INTO boards (id, name, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.owner_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO board_members (id, board_id, user_id, role)
            VALUES ($1, $2, $3, 'owner')
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(row.id)
        .bind(input.owner_id)
        .execute(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn get_board(&self, id: Uuid) -> Result<Option<BoardRow>> {
        let row = sqlx::query_as::<_, BoardRow>(
            r#"
            SELECT id, name, description, owner_id, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Row-locked `get_board` inside the caller's transaction, for reads
    /// whose snapshot feeds a write in the same transaction.
    pub async fn get_board_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<BoardRow>> {
        let row = sqlx::query_as::<_, BoardRow>(
            r#"
            SELECT id, name, description, owner_id, created_at, updated_at
            FROM boards
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn list_boards_for_user(&self, user_id: Uuid) -> Result<Vec<BoardRow>> {
        let rows = sqlx::query_as::<_, BoardRow>(
            r#"
            SELECT b.id, b.name, b.description, b.owner_id, b.created_at, b.updated_at
            FROM boards b
            JOIN board_members m ON m.board_id = b.id
            WHERE m.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_board(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        patch: &BoardPatch,
    ) -> Result<Option<BoardRow>> {
        let row = sqlx::query_as::<_, BoardRow>(
            r#"
            UPDATE boards
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Overwrite a board's mutable fields with a prior snapshot. Zero rows
    /// means the board is already gone; the caller treats that as a no-op.
    pub async fn overwrite_board(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &BoardSnapshot,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE boards
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.name)
        .bind(&snapshot.description)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard delete; the board's tasks, members, and event log cascade away
    pub async fn delete_board(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_member(&self, board_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM board_members
            WHERE board_id = $1 AND user_id = $2
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    // ============================================
    // Tasks
    // ============================================

    pub async fn create_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: CreateTask,
    ) -> Result<TaskRow> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, board_id, title, status, assigned_to, details, created_by)
            VALUES ($1, $2, $3, COALESCE($4, 'open'), $5, $6, $7)
            RETURNING id, board_id, title, status, assigned_to, details, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.board_id)
        .bind(&input.title)
        .bind(&input.status)
        .bind(&input.assigned_to)
        .bind(&input.details)
        .bind(input.created_by)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, board_id, title, status, assigned_to, details, created_by, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Row-locked `get_task` inside the caller's transaction.
    pub async fn get_task_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, board_id, title, status, assigned_to, details, created_by, created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn list_tasks(&self, board_id: Uuid) -> Result<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, board_id, title, status, assigned_to, details, created_by, created_at, updated_at
            FROM tasks
            WHERE board_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                status = COALESCE($3, status),
                assigned_to = COALESCE($4, assigned_to),
                details = COALESCE($5, details),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, title, status, assigned_to, details, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.status)
        .bind(&patch.assigned_to)
        .bind(&patch.details)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Overwrite a task's mutable fields with a prior snapshot. Zero rows
    /// means the task is already gone; the caller treats that as a no-op.
    pub async fn overwrite_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &TaskSnapshot,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, status = $3, assigned_to = $4, details = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.title)
        .bind(&snapshot.status)
        .bind(&snapshot.assigned_to)
        .bind(&snapshot.details)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_task(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recreate a deleted task under its original id. `ON CONFLICT DO
    /// NOTHING` keeps racing restores from double-applying.
    pub async fn restore_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &TaskSnapshot,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, board_id, title, status, assigned_to, details, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.board_id)
        .bind(&snapshot.title)
        .bind(&snapshot.status)
        .bind(&snapshot.assigned_to)
        .bind(&snapshot.details)
        .bind(snapshot.created_by)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Comments
    // ============================================

    pub async fn create_comment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: CreateComment,
    ) -> Result<CommentRow> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, task_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.task_id)
        .bind(input.author_id)
        .bind(&input.content)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn get_comment(&self, id: Uuid) -> Result<Option<CommentRow>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, task_id, author_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Row-locked `get_comment` inside the caller's transaction.
    pub async fn get_comment_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<CommentRow>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, task_id, author_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn list_comments(&self, task_id: Uuid) -> Result<Vec<CommentRow>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, task_id, author_id, content, created_at, updated_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn update_comment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        content: &str,
    ) -> Result<Option<CommentRow>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, author_id, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn delete_comment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recreate a deleted comment under its original id, failing closed on a
    /// racing restore
    pub async fn restore_comment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &CommentSnapshot,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (id, task_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.task_id)
        .bind(snapshot.author_id)
        .bind(&snapshot.content)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
