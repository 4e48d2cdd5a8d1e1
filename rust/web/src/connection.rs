//! Outbound half of a player connection.
//!
//! The socket writer task owns the receiving end; everything else holds a
//! cloned [`Connection`] and pushes [`ServerMessage`]s without blocking.

use crate::protocol::ServerMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    /// Creates a connection with a process-unique id and the receiver its
    /// writer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, sender }, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `message`. A closed connection drops it and returns `false`.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.sender.send(message) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(connection_id = self.id, "dropping message for closed connection");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let (a, _ra) = Connection::channel();
        let (b, _rb) = Connection::channel();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn send_reports_closed_receiver() {
        let (conn, mut rx) = Connection::channel();
        assert!(conn.send(ServerMessage::Waiting("x".into())));
        assert_eq!(rx.try_recv().ok(), Some(ServerMessage::Waiting("x".into())));

        drop(rx);
        assert!(conn.is_closed());
        assert!(!conn.send(ServerMessage::Error("late".into())));
    }
}
