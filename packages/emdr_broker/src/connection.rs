//! Broker-side view of a live WebSocket.
//!
//! The transport task owns the socket; the broker only keeps a
//! [`ConnectionHandle`], the sending half of that task's [`OutboundQueue`].
//! Frames go through a bounded queue and are dropped when it is full. The
//! close signal travels on its own watch channel, so a backed-up queue can
//! never swallow it. Once the task ends every send through a stale handle is
//! skipped.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Unique per connection (UUID v4).
pub type ConnectionId = String;

/// Close code sent to clients when their host goes away.
pub const HOST_DISCONNECTED_CODE: u16 = 1000;
pub const HOST_DISCONNECTED_REASON: &str = "Host disconnected";

/// Work item for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// One encoded envelope, sent as a binary message.
    Frame(Bytes),
    /// Send a close frame and stop writing.
    Close { code: u16, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CloseSignal {
    code: u16,
    reason: &'static str,
}

impl From<CloseSignal> for Outbound {
    fn from(signal: CloseSignal) -> Self {
        Outbound::Close {
            code: signal.code,
            reason: signal.reason,
        }
    }
}

/// Result of a single non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The transport is gone; not an error.
    Closed,
    /// The writer fell behind and the frame was dropped.
    Full,
}

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    frames: mpsc::Sender<Bytes>,
    close: Arc<watch::Sender<Option<CloseSignal>>>,
}

/// Receiving half owned by the writer task.
#[derive(Debug)]
pub struct OutboundQueue {
    frames: mpsc::Receiver<Bytes>,
    close: watch::Receiver<Option<CloseSignal>>,
    close_taken: bool,
}

impl ConnectionHandle {
    /// New handle plus the queue its writer drains. `capacity` bounds queued frames only.
    pub fn channel(id: ConnectionId, capacity: usize) -> (Self, OutboundQueue) {
        let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = watch::channel(None);
        let handle = Self {
            id,
            frames: frames_tx,
            close: Arc::new(close_tx),
        };
        let queue = OutboundQueue {
            frames: frames_rx,
            close: close_rx,
            close_taken: false,
        };
        (handle, queue)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the writer task is still draining this connection's queue.
    pub fn is_open(&self) -> bool {
        !self.frames.is_closed()
    }

    /// Queue an encoded frame without waiting.
    pub fn send_frame(&self, frame: Bytes) -> SendOutcome {
        match self.frames.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %self.id, "connection closed, skipping send");
                SendOutcome::Closed
            }
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "outbound queue full, dropping frame");
                SendOutcome::Full
            }
        }
    }

    /// Ask the writer to close the socket once the frames already queued are out.
    ///
    /// Never waits and never fails for lack of queue space.
    pub fn close(&self, code: u16, reason: &'static str) -> SendOutcome {
        if !self.is_open() {
            debug!(conn_id = %self.id, "connection closed, skipping close");
            return SendOutcome::Closed;
        }
        self.close.send_replace(Some(CloseSignal { code, reason }));
        SendOutcome::Sent
    }
}

impl OutboundQueue {
    /// Next item for the writer: queued frames first, then the close signal.
    /// `None` once every handle is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        loop {
            if let Ok(item) = self.try_recv() {
                return Some(item);
            }
            if self.close_taken {
                return None;
            }
            tokio::select! {
                frame = self.frames.recv() => return frame.map(Outbound::Frame),
                changed = self.close.changed() => {
                    if changed.is_err() {
                        return self.frames.recv().await.map(Outbound::Frame);
                    }
                }
            }
        }
    }

    /// Non-blocking form of [`recv`](Self::recv). The close signal is handed out once.
    pub fn try_recv(&mut self) -> Result<Outbound, TryRecvError> {
        let err = match self.frames.try_recv() {
            Ok(frame) => return Ok(Outbound::Frame(frame)),
            Err(err) => err,
        };
        if self.close_taken {
            return Err(err);
        }
        let pending = *self.close.borrow_and_update();
        match pending {
            Some(signal) => {
                self.close_taken = true;
                Ok(signal.into())
            }
            None => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (ConnectionHandle, OutboundQueue) {
        ConnectionHandle::channel("conn-1".into(), capacity)
    }

    #[tokio::test]
    async fn send_frame_reaches_writer() {
        let (conn, mut rx) = make_connection(4);
        assert_eq!(
            conn.send_frame(Bytes::from_static(b"abc")),
            SendOutcome::Sent
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Outbound::Frame(Bytes::from_static(b"abc"))
        );
    }

    #[test]
    fn send_after_writer_gone_is_skipped() {
        let (conn, rx) = make_connection(4);
        assert!(conn.is_open());
        drop(rx);
        assert!(!conn.is_open());
        assert_eq!(
            conn.send_frame(Bytes::from_static(b"abc")),
            SendOutcome::Closed
        );
        assert_eq!(conn.close(1000, "bye"), SendOutcome::Closed);
    }

    #[test]
    fn full_queue_drops() {
        let (conn, _rx) = make_connection(1);
        assert_eq!(conn.send_frame(Bytes::new()), SendOutcome::Sent);
        assert_eq!(conn.send_frame(Bytes::new()), SendOutcome::Full);
    }

    #[test]
    fn close_follows_queued_frames() {
        let (conn, mut rx) = make_connection(4);
        conn.send_frame(Bytes::from_static(b"last"));
        conn.close(HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON);
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Frame(_)));
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Close {
                code: 1000,
                reason: "Host disconnected"
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_gets_through_a_full_queue() {
        let (conn, mut rx) = make_connection(1);
        assert_eq!(conn.send_frame(Bytes::from_static(b"x")), SendOutcome::Sent);
        assert_eq!(conn.send_frame(Bytes::from_static(b"y")), SendOutcome::Full);

        assert_eq!(
            conn.close(HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON),
            SendOutcome::Sent
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Outbound::Frame(Bytes::from_static(b"x"))
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Outbound::Close {
                code: HOST_DISCONNECTED_CODE,
                reason: HOST_DISCONNECTED_REASON
            }
        );
    }

    #[tokio::test]
    async fn waiting_writer_wakes_on_close() {
        let (conn, mut rx) = make_connection(4);
        let writer = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        conn.close(HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON);
        assert!(matches!(
            writer.await.unwrap(),
            Some(Outbound::Close { code: 1000, .. })
        ));
    }

    #[tokio::test]
    async fn recv_ends_when_handles_are_gone() {
        let (conn, mut rx) = make_connection(4);
        drop(conn);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn clones_share_the_queue() {
        let (conn, mut rx) = make_connection(4);
        let other = conn.clone();
        assert_eq!(other.id(), "conn-1");
        other.send_frame(Bytes::from_static(b"x"));
        assert!(rx.try_recv().is_ok());
    }
}
