// Board service: CRUD plus the cached board-detail composition

use std::sync::Arc;

use uuid::Uuid;

use driftboard_core::{
    constants::BOARD_CACHE_TTL,
    types::{Board, BoardPatch, BoardSnapshot},
    EventBody, ServerMessage,
};
use driftboard_realtime::{BoardCache, BroadcastHub};
use driftboard_storage::{event_log, models::CreateBoard, Database};

use crate::boards::BoardDetail;
use crate::error::ApiError;

pub struct BoardService {
    db: Arc<Database>,
    cache: Arc<BoardCache>,
    hub: Arc<BroadcastHub>,
}

impl BoardService {
    pub fn new(db: Arc<Database>, cache: Arc<BoardCache>, hub: Arc<BroadcastHub>) -> Self {
        Self { db, cache, hub }
    }

    /// Create a board; the creator becomes its owner member and the log
    /// opens with a `board.created` event
    pub async fn create(
        &self,
        user_id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Board, ApiError> {
        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .create_board(
                &mut tx,
                CreateBoard {
                    name,
                    description,
                    owner_id: user_id,
                },
            )
            .await?;
        event_log::append(
            &mut tx,
            row.id,
            &EventBody::BoardCreated { board_id: row.id },
            user_id,
        )
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Board>, ApiError> {
        let rows = self.db.list_boards_for_user(user_id).await?;
        Ok(rows.into_iter().map(Board::from).collect())
    }

    /// Board with its tasks, memoized for [`BOARD_CACHE_TTL`]
    pub async fn detail(&self, board_id: Uuid) -> Result<BoardDetail, ApiError> {
        let cache_key = BoardCache::board_key(board_id);
        if let Some(cached) = self.cache.get(&cache_key) {
            if let Ok(detail) = serde_json::from_value::<BoardDetail>(cached) {
                return Ok(detail);
            }
        }

        let board = self
            .db
            .get_board(board_id)
            .await?
            .ok_or(ApiError::NotFound("board"))?;
        let tasks = self.db.list_tasks(board_id).await?;
        let detail = BoardDetail {
            board: board.into(),
            tasks: tasks.into_iter().map(Into::into).collect(),
        };

        if let Ok(value) = serde_json::to_value(&detail) {
            self.cache.set(cache_key, value, BOARD_CACHE_TTL);
        }
        Ok(detail)
    }

    pub async fn update(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        patch: BoardPatch,
    ) -> Result<Board, ApiError> {
        let previous = self
            .db
            .get_board(board_id)
            .await?
            .ok_or(ApiError::NotFound("board"))?;
        let snapshot = BoardSnapshot {
            id: previous.id,
            name: previous.name,
            description: previous.description,
        };

        let mut tx = self.db.pool().begin().await?;
        let row = self
            .db
            .update_board(&mut tx, board_id, &patch)
            .await?
            .ok_or(ApiError::NotFound("board"))?;
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::BoardUpdated {
                board_id,
                patch,
                previous: snapshot,
            },
            user_id,
        )
        .await?;
        tx.commit().await?;

        let board: Board = row.into();
        self.cache.invalidate(board_id);
        self.hub.publish(
            board_id,
            &ServerMessage::BoardUpdated {
                board: board.clone(),
            },
        );
        Ok(board)
    }

    /// Hard delete. The event log cascades away with the board, so the
    /// deletion is only announced live, never logged.
    pub async fn delete(&self, board_id: Uuid) -> Result<(), ApiError> {
        if !self.db.delete_board(board_id).await? {
            return Err(ApiError::NotFound("board"));
        }
        self.cache.invalidate(board_id);
        self.hub
            .publish(board_id, &ServerMessage::BoardDeleted { board_id });
        Ok(())
    }
}
