use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// In-memory fanout for realtime delivery. A room is a conversation; each
/// connected socket registers once, subscribes to at most one room at a
/// time, and receives frames over its outbound channel.
///
/// Broadcasting to a room with no subscribers is a no-op; persistence never
/// depends on delivery.
#[derive(Default)]
pub struct RoomBroker {
    rooms: DashMap<i64, HashMap<u64, mpsc::UnboundedSender<String>>>,
    /// conn_id -> currently subscribed room.
    memberships: DashMap<u64, i64>,
    next_conn_id: AtomicU64,
}

impl RoomBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a connection id, unique for the life of the process.
    pub fn register(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Subscribe a connection to a room, replacing any previous subscription.
    pub fn join(
        &self,
        conn_id: u64,
        conversation_id: i64,
        sender: mpsc::UnboundedSender<String>,
    ) {
        self.leave(conn_id);
        self.rooms
            .entry(conversation_id)
            .or_default()
            .insert(conn_id, sender);
        self.memberships.insert(conn_id, conversation_id);
    }

    /// Drop a connection's subscription, removing the room once empty.
    pub fn leave(&self, conn_id: u64) {
        let Some((_, room)) = self.memberships.remove(&conn_id) else {
            return;
        };
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(&conn_id);
            if members.is_empty() {
                drop(members);
                self.rooms.remove_if(&room, |_, m| m.is_empty());
            }
        }
    }

    /// Send a frame to every subscriber of a room. Returns the number of
    /// connections reached. Senders whose receiving task has gone away are
    /// pruned on the spot.
    pub fn broadcast(&self, conversation_id: i64, frame: &str) -> usize {
        let Some(mut members) = self.rooms.get_mut(&conversation_id) else {
            return 0;
        };
        let mut dead: Vec<u64> = Vec::new();
        let mut reached = 0;
        for (conn_id, sender) in members.iter() {
            if sender.send(frame.to_string()).is_ok() {
                reached += 1;
            } else {
                dead.push(*conn_id);
            }
        }
        for conn_id in dead {
            members.remove(&conn_id);
            self.memberships.remove(&conn_id);
        }
        reached
    }

    pub fn room_size(&self, conversation_id: i64) -> usize {
        self.rooms
            .get(&conversation_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_room_members_only() {
        let broker = RoomBroker::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();

        let a = broker.register();
        let b = broker.register();
        let c = broker.register();
        broker.join(a, 100, tx_a);
        broker.join(b, 100, tx_b);
        broker.join(c, 200, tx_c);

        assert_eq!(broker.broadcast(100, "hello"), 2);
        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_b.try_recv().unwrap(), "hello");
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn broadcast_to_empty_room_is_noop() {
        let broker = RoomBroker::new();
        assert_eq!(broker.broadcast(999, "anyone?"), 0);
    }

    #[test]
    fn join_replaces_previous_room() {
        let broker = RoomBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let conn = broker.register();
        broker.join(conn, 100, tx.clone());
        broker.join(conn, 200, tx);

        assert_eq!(broker.room_size(100), 0);
        assert_eq!(broker.room_size(200), 1);
        assert_eq!(broker.broadcast(100, "old room"), 0);
        assert_eq!(broker.broadcast(200, "new room"), 1);
        assert_eq!(rx.try_recv().unwrap(), "new room");
    }

    #[test]
    fn leave_removes_subscription() {
        let broker = RoomBroker::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn = broker.register();
        broker.join(conn, 100, tx);
        broker.leave(conn);
        assert_eq!(broker.room_size(100), 0);
        // Leaving twice is harmless.
        broker.leave(conn);
    }

    #[test]
    fn dead_senders_are_pruned_on_broadcast() {
        let broker = RoomBroker::new();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        drop(rx_dead);

        let live = broker.register();
        let dead = broker.register();
        broker.join(live, 100, tx_live);
        broker.join(dead, 100, tx_dead);

        assert_eq!(broker.broadcast(100, "ping"), 1);
        assert_eq!(rx_live.try_recv().unwrap(), "ping");
        assert_eq!(broker.room_size(100), 1);
    }
}
