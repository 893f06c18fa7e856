// Short-TTL read cache for expensive board compositions.
//
// Eviction is TTL comparison at read time only (no background sweep), plus
// board-scoped invalidation that every mutation path calls as part of its
// unit of work: a stale cached read is directly visible to every connected
// client, so invalidation is a structural contract, not an optimization.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
pub struct BoardCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl BoardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for the cached events page of a board
    pub fn events_key(board_id: Uuid, after_seq: i64, limit: i64) -> String {
        format!("events:{board_id}:{after_seq}:{limit}")
    }

    /// Key for the cached board detail composition
    pub fn board_key(board_id: Uuid) -> String {
        format!("board:{board_id}")
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            entries.remove(key);
            return None;
        }
        Some(entry.data.clone())
    }

    pub fn set(&self, key: impl Into<String>, data: serde_json::Value, ttl: Duration) {
        self.lock().insert(
            key.into(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every entry belonging to the board, regardless of remaining TTL.
    /// Keys embed the board id, so a substring match covers both key shapes.
    pub fn invalidate(&self, board_id: Uuid) {
        let marker = board_id.to_string();
        self.lock().retain(|key, _| !key.contains(&marker));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_before_ttl_and_none_after_expiry() {
        let cache = BoardCache::new();
        cache.set("k", json!({"n": 1}), Duration::from_millis(30));

        assert_eq!(cache.get("k"), Some(json!({"n": 1})));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_invalidate_wins_over_remaining_ttl() {
        let cache = BoardCache::new();
        let board_id = Uuid::now_v7();
        cache.set(
            BoardCache::board_key(board_id),
            json!("detail"),
            Duration::from_secs(60),
        );
        cache.set(
            BoardCache::events_key(board_id, 0, 50),
            json!(["e1"]),
            Duration::from_secs(60),
        );

        cache.invalidate(board_id);

        assert_eq!(cache.get(&BoardCache::board_key(board_id)), None);
        assert_eq!(cache.get(&BoardCache::events_key(board_id, 0, 50)), None);
    }

    #[test]
    fn test_invalidate_is_board_scoped() {
        let cache = BoardCache::new();
        let victim = Uuid::now_v7();
        let bystander = Uuid::now_v7();
        cache.set(
            BoardCache::board_key(victim),
            json!("a"),
            Duration::from_secs(60),
        );
        cache.set(
            BoardCache::board_key(bystander),
            json!("b"),
            Duration::from_secs(60),
        );

        cache.invalidate(victim);

        assert_eq!(cache.get(&BoardCache::board_key(victim)), None);
        assert_eq!(cache.get(&BoardCache::board_key(bystander)), Some(json!("b")));
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let cache = BoardCache::new();
        cache.set("k", json!(1), Duration::from_secs(60));
        cache.set("k", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }
}
