// Undo/redo engine.
//
// Given a past event id, synthesize and apply its inverse (undo) or replay
// its forward effect (redo), recording the corrective action as a new log
// event in the same transaction. Structurally non-invertible targets (a
// missing snapshot, an `undo` event itself, a `board.created` whose
// inversion would drop the whole board and its log) return `None` so
// callers disable the control instead of showing an error.
//
// Racing inverses fail closed: the underlying delete reports zero rows, the
// restore hits `ON CONFLICT DO NOTHING`, and either way the second caller
// gets the no-op result with its transaction rolled back, never a silent
// double-apply.

use std::sync::Arc;

use uuid::Uuid;

use driftboard_core::{
    types::{BoardSnapshot, CommentSnapshot, Task, TaskSnapshot},
    EventBody, ServerMessage, UndoOutcome,
};
use driftboard_realtime::{BoardCache, BroadcastHub};
use driftboard_storage::{event_log, models::BoardEventRow, Database};

use crate::error::ApiError;

pub struct UndoEngine {
    db: Arc<Database>,
    cache: Arc<BoardCache>,
    hub: Arc<BroadcastHub>,
}

impl UndoEngine {
    pub fn new(db: Arc<Database>, cache: Arc<BoardCache>, hub: Arc<BroadcastHub>) -> Self {
        Self { db, cache, hub }
    }

    /// Invert a past event. Returns `None` when the event is unknown or
    /// cannot be inverted (no-op), `Some(outcome)` when the compensating
    /// write committed.
    pub async fn undo(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<UndoOutcome>, ApiError> {
        let Some((event, body)) = self.load_authorized(event_id, user_id).await? else {
            return Ok(None);
        };
        let board_id = event.board_id;

        let mut tx = self.db.pool().begin().await?;
        let outcome = match body {
            // created: invert = delete that id
            EventBody::TaskCreated { task_id } => self
                .db
                .delete_task(&mut tx, task_id)
                .await?
                .then_some(UndoOutcome::TaskDeleted { task_id }),
            // updated: invert = overwrite with the prior snapshot
            EventBody::TaskUpdated {
                task_id, previous, ..
            } => self
                .db
                .overwrite_task(&mut tx, &previous)
                .await?
                .then_some(UndoOutcome::TaskReverted { task_id }),
            // deleted: invert = recreate with the original id and fields
            EventBody::TaskDeleted { task } => self
                .db
                .restore_task(&mut tx, &task)
                .await?
                .then_some(UndoOutcome::TaskRestored { task_id: task.id }),
            EventBody::CommentAdded { comment_id } => self
                .db
                .delete_comment(&mut tx, comment_id)
                .await?
                .then_some(UndoOutcome::CommentDeleted { comment_id }),
            EventBody::CommentUpdated {
                comment_id,
                previous_content,
                ..
            } => self
                .db
                .update_comment(&mut tx, comment_id, &previous_content)
                .await?
                .map(|_| UndoOutcome::CommentReverted { comment_id }),
            EventBody::CommentDeleted { comment } => self
                .db
                .restore_comment(&mut tx, &comment)
                .await?
                .then_some(UndoOutcome::CommentRestored {
                    comment_id: comment.id,
                }),
            EventBody::BoardUpdated { previous, .. } => self
                .db
                .overwrite_board(&mut tx, &previous)
                .await?
                .then_some(UndoOutcome::BoardReverted { board_id }),
            EventBody::BoardCreated { .. } | EventBody::Undo { .. } => None,
        };

        let Some(outcome) = outcome else {
            tx.rollback().await?;
            return Ok(None);
        };

        event_log::append(
            &mut tx,
            board_id,
            &EventBody::Undo {
                undone_event_id: event_id,
                action: outcome,
            },
            user_id,
        )
        .await?;
        tx.commit().await?;

        self.finish(board_id, event_id, outcome);
        Ok(Some(outcome))
    }

    /// Replay a past event's forward effect. Appends a new event of the
    /// original type, not a second `undo` type, so undoing a redo goes
    /// through the same handler as undoing any normal edit. Prior snapshots
    /// are recaptured at redo time to keep the new event invertible.
    pub async fn redo(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<UndoOutcome>, ApiError> {
        let Some((event, body)) = self.load_authorized(event_id, user_id).await? else {
            return Ok(None);
        };
        let board_id = event.board_id;

        // Each arm recaptures the prior state under a row lock in the same
        // transaction as the write, so the logged snapshot cannot be stale
        // relative to a racing edit.
        let mut tx = self.db.pool().begin().await?;
        let outcome = match body {
            EventBody::TaskUpdated { task_id, patch, .. } => {
                let Some(current) = self.db.get_task_for_update(&mut tx, task_id).await? else {
                    tx.rollback().await?;
                    return Ok(None);
                };
                let previous = TaskSnapshot::from(&Task::from(current));

                if self.db.update_task(&mut tx, task_id, &patch).await?.is_none() {
                    tx.rollback().await?;
                    return Ok(None);
                }
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
                UndoOutcome::TaskReverted { task_id }
            }
            EventBody::TaskDeleted { task } => {
                let Some(current) = self.db.get_task_for_update(&mut tx, task.id).await? else {
                    tx.rollback().await?;
                    return Ok(None);
                };
                let snapshot = TaskSnapshot::from(&Task::from(current));

                if !self.db.delete_task(&mut tx, task.id).await? {
                    tx.rollback().await?;
                    return Ok(None);
                }
                event_log::append(
                    &mut tx,
                    board_id,
                    &EventBody::TaskDeleted { task: snapshot },
                    user_id,
                )
                .await?;
                UndoOutcome::TaskDeleted { task_id: task.id }
            }
            EventBody::CommentUpdated {
                comment_id,
                content,
                ..
            } => {
                let Some(current) = self.db.get_comment_for_update(&mut tx, comment_id).await?
                else {
                    tx.rollback().await?;
                    return Ok(None);
                };

                if self
                    .db
                    .update_comment(&mut tx, comment_id, &content)
                    .await?
                    .is_none()
                {
                    tx.rollback().await?;
                    return Ok(None);
                }
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
                UndoOutcome::CommentReverted { comment_id }
            }
            EventBody::CommentDeleted { comment } => {
                let Some(current) = self.db.get_comment_for_update(&mut tx, comment.id).await?
                else {
                    tx.rollback().await?;
                    return Ok(None);
                };
                let snapshot = CommentSnapshot {
                    id: current.id,
                    task_id: current.task_id,
                    author_id: current.author_id,
                    content: current.content,
                };

                if !self.db.delete_comment(&mut tx, comment.id).await? {
                    tx.rollback().await?;
                    return Ok(None);
                }
                event_log::append(
                    &mut tx,
                    board_id,
                    &EventBody::CommentDeleted { comment: snapshot },
                    user_id,
                )
                .await?;
                UndoOutcome::CommentDeleted {
                    comment_id: comment.id,
                }
            }
            EventBody::BoardUpdated { patch, .. } => {
                let Some(current) = self.db.get_board_for_update(&mut tx, board_id).await? else {
                    tx.rollback().await?;
                    return Ok(None);
                };
                let previous = BoardSnapshot {
                    id: current.id,
                    name: current.name,
                    description: current.description,
                };

                if self
                    .db
                    .update_board(&mut tx, board_id, &patch)
                    .await?
                    .is_none()
                {
                    tx.rollback().await?;
                    return Ok(None);
                }
                event_log::append(
                    &mut tx,
                    board_id,
                    &EventBody::BoardUpdated {
                        board_id,
                        patch,
                        previous,
                    },
                    user_id,
                )
                .await?;
                UndoOutcome::BoardReverted { board_id }
            }
            // created events only carry the new entity's id, which is not
            // enough to recreate it; undo events are not replayable
            EventBody::TaskCreated { .. }
            | EventBody::CommentAdded { .. }
            | EventBody::BoardCreated { .. }
            | EventBody::Undo { .. } => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        tx.commit().await?;
        self.finish(board_id, event_id, outcome);
        Ok(Some(outcome))
    }

    /// Fetch the event and check the caller belongs to its board. `None`
    /// for a missing event or an unparseable body (both no-ops).
    async fn load_authorized(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<(BoardEventRow, EventBody)>, ApiError> {
        let Some(event) = event_log::get_event_by_id(self.db.pool(), event_id).await? else {
            return Ok(None);
        };
        if !self.db.is_member(event.board_id, user_id).await? {
            return Err(ApiError::Forbidden);
        }
        match EventBody::from_parts(&event.event_type, &event.payload) {
            Ok(body) => Ok(Some((event, body))),
            Err(err) => {
                tracing::warn!(event_id = %event_id, "non-invertible event payload: {}", err);
                Ok(None)
            }
        }
    }

    /// Post-commit tail shared by undo and redo: drop the board's cached
    /// reads, then announce the corrective action. A failed publish is fine;
    /// the event is durable and clients resynchronize from the log.
    fn finish(&self, board_id: Uuid, event_id: Uuid, outcome: UndoOutcome) {
        self.cache.invalidate(board_id);
        self.hub.publish(
            board_id,
            &ServerMessage::Undo {
                event_id,
                result: outcome,
            },
        );
    }
}
