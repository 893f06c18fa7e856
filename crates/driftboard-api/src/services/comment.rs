// Comment service: same append / invalidate / publish discipline as tasks

use std::sync::Arc;

use uuid::Uuid;

use driftboard_core::{
    types::{Comment, CommentSnapshot},
    EventBody, ServerMessage,
};
use driftboard_realtime::{BoardCache, BroadcastHub};
use driftboard_storage::{event_log, models::CreateComment, Database};

use crate::error::ApiError;

pub struct CommentService {
    db: Arc<Database>,
    cache: Arc<BoardCache>,
    hub: Arc<BroadcastHub>,
}

impl CommentService {
    pub fn new(db: Arc<Database>, cache: Arc<BoardCache>, hub: Arc<BroadcastHub>) -> Self {
        Self { db, cache, hub }
    }

    /// Board a comment lives on, via its task
    async fn board_of_task(&self, task_id: Uuid) -> Result<Uuid, ApiError> {
        let task = self
            .db
            .get_task(task_id)
            .await?
            .ok_or(ApiError::NotFound("task"))?;
        Ok(task.board_id)
    }

    pub async fn add(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<Comment, ApiError> {
        let board_id = self.board_of_task(task_id).await?;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }

        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .create_comment(
                &mut tx,
                CreateComment {
                    task_id,
                    author_id: user_id,
                    content,
                },
            )
            .await?;
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::CommentAdded { comment_id: row.id },
            user_id,
        )
        .await?;
        tx.commit().await?;

        let comment: Comment = row.into();
        self.cache.invalidate(board_id);
        self.hub.publish(
            board_id,
            &ServerMessage::CommentAdded {
                comment: comment.clone(),
            },
        );
        Ok(comment)
    }

    pub async fn list(&self, task_id: Uuid, user_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        let board_id = self.board_of_task(task_id).await?;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }
        let rows = self.db.list_comments(task_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Edit a comment, logging the previous content for inversion
    pub async fn update(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<Comment, ApiError> {
        let current = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(ApiError::NotFound("comment"))?;
        let board_id = self.board_of_task(current.task_id).await?;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }

        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .update_comment(&mut tx, comment_id, &content)
            .await?
            .ok_or(ApiError::NotFound("comment"))?;
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::CommentUpdated {
                comment_id,
                content,
                previous_content: current.content,
            },
            user_id,
        )
        .await?;
        tx.commit().await?;

        let comment: Comment = row.into();
        self.cache.invalidate(board_id);
        self.hub.publish(
            board_id,
            &ServerMessage::CommentUpdated {
                comment: comment.clone(),
            },
        );
        Ok(comment)
    }

    /// Delete, logging the full snapshot so undo can restore it
    pub async fn delete(&self, comment_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        let current: Comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(ApiError::NotFound("comment"))?
            .into();
        let board_id = self.board_of_task(current.task_id).await?;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }
        let snapshot = CommentSnapshot::from(&current);

        let mut tx = self.db.pool().begin().await?;
        if !self.db.delete_comment(&mut tx, comment_id).await? {
            tx.rollback().await?;
            return Err(ApiError::NotFound("comment"));
        }
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::CommentDeleted { comment: snapshot },
            user_id,
        )
        .await?;
        tx.commit().await?;

        self.cache.invalidate(board_id);
        self.hub.publish(
            board_id,
            &ServerMessage::CommentDeleted {
                comment_id,
                task_id: current.task_id,
            },
        );
        Ok(())
    }
}
