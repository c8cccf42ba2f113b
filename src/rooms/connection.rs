use std::{fmt, sync::Arc};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::{RoomError, RoomResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(Uuid);

impl ConnId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What the socket writer of a connection is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(Arc<str>),
    Close,
}

/// Frames a connection may have queued before further sends to it fail.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Handle to one live client connection.
///
/// Sending only enqueues onto the connection's bounded outbound queue; the
/// socket writer drains it. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnId,
    tx: mpsc::Sender<Outbound>,
}

impl Connection {
    pub fn new() -> (Self, mpsc::Receiver<Outbound>) {
        Self::with_capacity(OUTBOUND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { id: ConnId::new(), tx }, rx)
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Never waits: a full queue means the client is not keeping up, and the
    /// frame is dropped for it alone.
    pub fn send(&self, payload: Arc<str>) -> RoomResult<()> {
        self.tx.try_send(Outbound::Text(payload)).map_err(|err| {
            if let TrySendError::Full(_) = err {
                log::debug!("outbound queue of {} is full", self.id);
            }
            RoomError::SendFailed(self.id)
        })
    }

    /// Asks the writer to close the socket. Closing twice, closing a
    /// connection whose socket is already gone, or closing one whose queue is
    /// full does nothing.
    pub fn close(&self) {
        let _ = self.tx.try_send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn send_enqueues_text() {
        let (conn, mut rx) = Connection::new();
        conn.send("hi".into()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("hi".into()));
    }

    #[test_log::test]
    fn send_to_dropped_receiver_fails() {
        let (conn, rx) = Connection::new();
        drop(rx);
        assert_eq!(conn.send("hi".into()), Err(RoomError::SendFailed(conn.id())));
        assert!(conn.is_closed());
    }

    #[test_log::test]
    fn send_to_full_queue_fails_without_waiting() {
        let (conn, mut rx) = Connection::with_capacity(2);
        conn.send("one".into()).unwrap();
        conn.send("two".into()).unwrap();
        assert_eq!(conn.send("three".into()), Err(RoomError::SendFailed(conn.id())));
        assert!(!conn.is_closed());

        conn.close();
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("one".into()));
        conn.send("four".into()).unwrap();
    }

    #[test_log::test]
    fn close_is_idempotent() {
        let (conn, rx) = Connection::new();
        conn.close();
        conn.close();
        drop(rx);
        conn.close();
    }

    #[test_log::test]
    fn clones_compare_by_id() {
        let (a, _rx_a) = Connection::new();
        let (b, _rx_b) = Connection::new();
        assert_eq!(a.clone(), a);
        assert!(a != b);
    }
}
