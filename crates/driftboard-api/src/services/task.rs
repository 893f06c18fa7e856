// Task service: each mutation writes the domain row and its event in one
// transaction, then invalidates the board cache and publishes live

use std::sync::Arc;

use uuid::Uuid;

use driftboard_core::{
    types::{Task, TaskPatch, TaskSnapshot},
    EventBody, ServerMessage,
};
use driftboard_realtime::{BoardCache, BroadcastHub};
use driftboard_storage::{event_log, models::CreateTask, Database};

use crate::error::ApiError;
use crate::tasks::CreateTaskRequest;

pub struct TaskService {
    db: Arc<Database>,
    cache: Arc<BoardCache>,
    hub: Arc<BroadcastHub>,
}

impl TaskService {
    pub fn new(db: Arc<Database>, cache: Arc<BoardCache>, hub: Arc<BroadcastHub>) -> Self {
        Self { db, cache, hub }
    }

    pub async fn create(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        req: CreateTaskRequest,
    ) -> Result<Task, ApiError> {
        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .create_task(
                &mut tx,
                CreateTask {
                    board_id,
                    title: req.title,
                    status: req.status,
                    assigned_to: req.assigned_to.unwrap_or_default(),
                    details: req.details,
                    created_by: Some(user_id),
                },
            )
            .await?;
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::TaskCreated { task_id: row.id },
            user_id,
        )
        .await?;
        tx.commit().await?;

        let task: Task = row.into();
        self.cache.invalidate(board_id);
        self.hub
            .publish(board_id, &ServerMessage::TaskCreated { task: task.clone() });
        Ok(task)
    }

    pub async fn list(&self, board_id: Uuid) -> Result<Vec<Task>, ApiError> {
        let rows = self.db.list_tasks(board_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply a patch, logging both the patch and the full prior snapshot so
    /// the event can be inverted
    pub async fn update(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, ApiError> {
        let current: Task = self
            .db
            .get_task(task_id)
            .await?
            .ok_or(ApiError::NotFound("task"))?
            .into();
        let board_id = current.board_id;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }
        let previous = TaskSnapshot::from(&current);

        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .update_task(&mut tx, task_id, &patch)
            .await?
            .ok_or(ApiError::NotFound("task"))?;
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::TaskUpdated {
                task_id,
                patch,
                previous,
            },
            user_id,
        )
        .await?;
        tx.commit().await?;

        let task: Task = row.into();
        self.cache.invalidate(board_id);
        self.hub
            .publish(board_id, &ServerMessage::TaskUpdated { task: task.clone() });
        Ok(task)
    }

    /// Delete, logging the full snapshot so undo can recreate the task
    /// under its original id
    pub async fn delete(&self, task_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        let current: Task = self
            .db
            .get_task(task_id)
            .await?
            .ok_or(ApiError::NotFound("task"))?
            .into();
        let board_id = current.board_id;
        if !self.db.is_member(board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }
        let snapshot = TaskSnapshot::from(&current);

        let mut tx = self.db.pool().begin().await?;
        if !self.db.delete_task(&mut tx, task_id).await? {
            tx.rollback().await?;
            return Err(ApiError::NotFound("task"));
        }
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::TaskDeleted { task: snapshot },
            user_id,
        )
        .await?;
        tx.commit().await?;

        self.cache.invalidate(board_id);
        self.hub
            .publish(board_id, &ServerMessage::TaskDeleted { task_id });
        Ok(())
    }
}
