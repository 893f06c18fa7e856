// Event replay reads, memoized per (board, after_seq, limit) page

use std::sync::Arc;

use uuid::Uuid;

use driftboard_core::{constants::BOARD_CACHE_TTL, BoardEvent};
use driftboard_realtime::BoardCache;
use driftboard_storage::{event_log, Database};

use crate::error::ApiError;

pub struct EventService {
    db: Arc<Database>,
    cache: Arc<BoardCache>,
}

impl EventService {
    pub fn new(db: Arc<Database>, cache: Arc<BoardCache>) -> Self {
        Self { db, cache }
    }

    /// Events with `seq > after_seq`, ascending, author-enriched. Pages are
    /// cached briefly; any board mutation invalidates them.
    pub async fn list(
        &self,
        board_id: Uuid,
        after_seq: i64,
        limit: i64,
    ) -> Result<Vec<BoardEvent>, ApiError> {
        let cache_key = BoardCache::events_key(board_id, after_seq, limit);
        if let Some(cached) = self.cache.get(&cache_key) {
            if let Ok(events) = serde_json::from_value::<Vec<BoardEvent>>(cached) {
                return Ok(events);
            }
        }

        let events = event_log::get_events(self.db.pool(), board_id, after_seq, limit).await?;
        if let Ok(value) = serde_json::to_value(&events) {
            self.cache.set(cache_key, value, BOARD_CACHE_TTL);
        }
        Ok(events)
    }
}
