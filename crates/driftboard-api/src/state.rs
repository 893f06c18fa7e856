// Shared application state.
//
// The realtime registries (hub, presence, limiters, cache) are constructed
// exactly once here and shared by every route and the WS gateway. Splitting
// them per call path would break fan-out: messages published from one path
// would never reach subscribers registered via another.

use std::sync::Arc;

use uuid::Uuid;

use driftboard_realtime::{BoardCache, BroadcastHub, FixedWindowLimiter, PresenceTracker};
use driftboard_storage::Database;

use crate::error::ApiError;
use crate::services::{BoardService, CommentService, EventService, TaskService, UndoEngine};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub hub: Arc<BroadcastHub>,
    pub presence: Arc<PresenceTracker>,
    pub api_limiter: Arc<FixedWindowLimiter>,
    pub stream_limiter: Arc<FixedWindowLimiter>,
    pub cache: Arc<BoardCache>,

    pub boards: Arc<BoardService>,
    pub tasks: Arc<TaskService>,
    pub comments: Arc<CommentService>,
    pub events: Arc<EventService>,
    pub undo: Arc<UndoEngine>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let cache = Arc::new(BoardCache::new());

        Self {
            boards: Arc::new(BoardService::new(db.clone(), cache.clone(), hub.clone())),
            tasks: Arc::new(TaskService::new(db.clone(), cache.clone(), hub.clone())),
            comments: Arc::new(CommentService::new(db.clone(), cache.clone(), hub.clone())),
            events: Arc::new(EventService::new(db.clone(), cache.clone())),
            undo: Arc::new(UndoEngine::new(db.clone(), cache.clone(), hub.clone())),
            presence: Arc::new(PresenceTracker::new()),
            api_limiter: Arc::new(FixedWindowLimiter::api()),
            stream_limiter: Arc::new(FixedWindowLimiter::streaming()),
            db,
            hub,
            cache,
        }
    }

    /// Count one API call for the user; soft-deny with a retry hint when the
    /// window is exhausted
    pub fn enforce_api_limit(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.api_limiter.check(user_id) {
            Ok(())
        } else {
            Err(ApiError::RateLimited {
                retry_after_secs: self.api_limiter.retry_after_secs(user_id),
            })
        }
    }

    /// Board membership gate shared by the HTTP routes and the WS upgrade
    pub async fn require_member(&self, board_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        if self.db.is_member(board_id, user_id).await? {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
