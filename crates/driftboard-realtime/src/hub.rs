// Broadcast hub: best-effort, at-most-once delivery to every connection
// registered for a board.
//
// One registry maps board id to its live connections. Sends are non-blocking
// (an unbounded channel drained by each connection's writer task); a failed
// send means the writer is gone, so the connection is evicted rather than
// retried. No queueing, no buffering: a disconnected recipient misses the
// message and resynchronizes through the event log.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use driftboard_core::ServerMessage;

/// Send handle for one live connection. The receiving half is drained by the
/// connection's writer task; when that task exits, sends start failing and
/// the hub evicts the handle.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    sender: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(board_id: Uuid, user_id: Uuid) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::now_v7(),
                board_id,
                user_id,
                sender,
            },
            receiver,
        )
    }

    /// Queue a pre-serialized frame. `false` means the connection is dead.
    pub fn send_raw(&self, frame: String) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Serialize and queue a single message on this connection only
    pub fn send(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(frame) => self.send_raw(frame),
            Err(err) => {
                tracing::error!(conn_id = %self.id, "failed to serialize message: {}", err);
                false
            }
        }
    }
}

/// Process-wide registry of live connections per board
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<Uuid, HashMap<Uuid, ConnectionHandle>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, HashMap<Uuid, ConnectionHandle>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, conn: ConnectionHandle) {
        self.lock().entry(conn.board_id).or_default().insert(conn.id, conn);
    }

    pub fn unsubscribe(&self, board_id: Uuid, conn_id: Uuid) {
        let mut subscribers = self.lock();
        if let Some(set) = subscribers.get_mut(&board_id) {
            set.remove(&conn_id);
            if set.is_empty() {
                subscribers.remove(&board_id);
            }
        }
    }

    /// Deliver a message to every subscriber of the board. Serializes once,
    /// evicts connections whose send fails, and returns how many received
    /// the message. Zero subscribers is a no-op.
    pub fn publish(&self, board_id: Uuid, message: &ServerMessage) -> usize {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(board_id = %board_id, "publish serialization failed: {}", err);
                return 0;
            }
        };

        let mut subscribers = self.lock();
        let Some(set) = subscribers.get_mut(&board_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for conn in set.values() {
            if conn.send_raw(frame.clone()) {
                delivered += 1;
            } else {
                stale.push(conn.id);
            }
        }
        for conn_id in stale {
            set.remove(&conn_id);
        }
        if set.is_empty() {
            subscribers.remove(&board_id);
        }

        delivered
    }

    pub fn subscriber_count(&self, board_id: Uuid) -> usize {
        self.lock().get(&board_id).map_or(0, |set| set.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_with_zero_subscribers_is_a_noop() {
        let hub = BroadcastHub::new();
        let delivered = hub.publish(Uuid::now_v7(), &ServerMessage::Pong);
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = BroadcastHub::new();
        let board_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();

        let (conn_a, mut rx_a) = ConnectionHandle::new(board_id, user_id);
        let (conn_b, mut rx_b) = ConnectionHandle::new(board_id, user_id);
        hub.subscribe(conn_a);
        hub.subscribe(conn_b);

        let delivered = hub.publish(board_id, &ServerMessage::Pong);
        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await.unwrap(), r#"{"type":"pong"}"#);
        assert_eq!(rx_b.recv().await.unwrap(), r#"{"type":"pong"}"#);
    }

    #[tokio::test]
    async fn test_failed_send_evicts_only_the_dead_connection() {
        let hub = BroadcastHub::new();
        let board_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();

        let (dead, rx_dead) = ConnectionHandle::new(board_id, user_id);
        let (alive, mut rx_alive) = ConnectionHandle::new(board_id, user_id);
        hub.subscribe(dead);
        hub.subscribe(alive);
        drop(rx_dead);

        let delivered = hub.publish(board_id, &ServerMessage::Pong);
        assert_eq!(delivered, 1);
        assert!(rx_alive.recv().await.is_some());
        assert_eq!(hub.subscriber_count(board_id), 1);
    }

    #[test]
    fn test_unsubscribe_drops_empty_board_entry() {
        let hub = BroadcastHub::new();
        let board_id = Uuid::now_v7();
        let (conn, _rx) = ConnectionHandle::new(board_id, Uuid::now_v7());
        let conn_id = conn.id;

        hub.subscribe(conn);
        assert_eq!(hub.subscriber_count(board_id), 1);

        hub.unsubscribe(board_id, conn_id);
        assert_eq!(hub.subscriber_count(board_id), 0);
        assert!(hub.lock().is_empty());
    }

    #[test]
    fn test_messages_are_scoped_to_their_board() {
        let hub = BroadcastHub::new();
        let board_a = Uuid::now_v7();
        let board_b = Uuid::now_v7();

        let (conn, mut rx) = ConnectionHandle::new(board_b, Uuid::now_v7());
        hub.subscribe(conn);

        assert_eq!(hub.publish(board_a, &ServerMessage::Pong), 0);
        assert!(rx.try_recv().is_err());
    }
}
