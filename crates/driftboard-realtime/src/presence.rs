// Presence tracker: distinct users per board, collapsing multiple
// simultaneous connections (tabs) for one user into a single join/leave
// transition. Built on the same connection lifecycle as the broadcast hub.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

/// Display metadata shown in the "who's here" UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default)]
struct UserEntry {
    info: UserInfo,
    connections: HashSet<Uuid>,
}

#[derive(Default)]
pub struct PresenceTracker {
    boards: Mutex<HashMap<Uuid, HashMap<Uuid, UserEntry>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, HashMap<Uuid, UserEntry>>> {
        self.boards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection under `(board, user)`. Returns `true` when this
    /// is the user's first open connection on the board, i.e. when the
    /// caller should broadcast `presence.join`.
    pub fn connect(&self, board_id: Uuid, user_id: Uuid, conn_id: Uuid, info: UserInfo) -> bool {
        let mut boards = self.lock();
        let entry = boards
            .entry(board_id)
            .or_default()
            .entry(user_id)
            .or_default();
        entry.info = info;
        entry.connections.insert(conn_id);
        entry.connections.len() == 1
    }

    /// Deregister a connection. Returns `true` when the user's connection
    /// set became empty (metadata purged; caller broadcasts
    /// `presence.leave`).
    pub fn disconnect(&self, board_id: Uuid, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut boards = self.lock();
        let Some(users) = boards.get_mut(&board_id) else {
            return false;
        };
        let Some(entry) = users.get_mut(&user_id) else {
            return false;
        };
        entry.connections.remove(&conn_id);
        if !entry.connections.is_empty() {
            return false;
        }
        users.remove(&user_id);
        if users.is_empty() {
            boards.remove(&board_id);
        }
        true
    }

    /// Users currently present on the board, for the initial snapshot a new
    /// connection receives
    pub fn snapshot(&self, board_id: Uuid) -> Vec<(Uuid, UserInfo)> {
        self.lock()
            .get(&board_id)
            .map(|users| {
                users
                    .iter()
                    .map(|(user_id, entry)| (*user_id, entry.info.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn user_info(&self, board_id: Uuid, user_id: Uuid) -> Option<UserInfo> {
        self.lock()
            .get(&board_id)
            .and_then(|users| users.get(&user_id))
            .map(|entry| entry.info.clone())
    }

    pub fn user_count(&self, board_id: Uuid) -> usize {
        self.lock().get(&board_id).map_or(0, |users| users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> UserInfo {
        UserInfo {
            name: Some(name.to_string()),
            avatar_url: None,
        }
    }

    #[test]
    fn test_two_tabs_produce_one_join_and_one_leave() {
        let presence = PresenceTracker::new();
        let board_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let tab_a = Uuid::now_v7();
        let tab_b = Uuid::now_v7();

        assert!(presence.connect(board_id, user_id, tab_a, info("ada")));
        assert!(!presence.connect(board_id, user_id, tab_b, info("ada")));
        assert_eq!(presence.user_count(board_id), 1);

        assert!(!presence.disconnect(board_id, user_id, tab_a));
        assert!(presence.disconnect(board_id, user_id, tab_b));
        assert_eq!(presence.user_count(board_id), 0);
    }

    #[test]
    fn test_snapshot_lists_all_present_users() {
        let presence = PresenceTracker::new();
        let board_id = Uuid::now_v7();
        let ada = Uuid::now_v7();
        let lin = Uuid::now_v7();

        presence.connect(board_id, ada, Uuid::now_v7(), info("ada"));
        presence.connect(board_id, lin, Uuid::now_v7(), info("lin"));

        let mut snapshot = presence.snapshot(board_id);
        snapshot.sort_by_key(|(user_id, _)| *user_id);
        let mut expected = vec![(ada, info("ada")), (lin, info("lin"))];
        expected.sort_by_key(|(user_id, _)| *user_id);
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_metadata_is_purged_on_last_disconnect() {
        let presence = PresenceTracker::new();
        let board_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let conn_id = Uuid::now_v7();

        presence.connect(board_id, user_id, conn_id, info("ada"));
        assert!(presence.user_info(board_id, user_id).is_some());

        presence.disconnect(board_id, user_id, conn_id);
        assert!(presence.user_info(board_id, user_id).is_none());
        assert!(presence.snapshot(board_id).is_empty());
    }

    #[test]
    fn test_unknown_disconnect_is_harmless() {
        let presence = PresenceTracker::new();
        assert!(!presence.disconnect(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7()));
    }
}
