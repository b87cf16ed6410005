//! Best-effort fan-out of one envelope to many connections.

use emdr_wire::{Envelope, encode};

use crate::connection::{ConnectionHandle, SendOutcome};

/// Tally of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Recipients whose connection was gone or whose queue was full.
    pub skipped: usize,
    /// Subset of `skipped` that lost the frame to a full queue.
    pub dropped: usize,
}

impl Delivery {
    fn record(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Sent => self.delivered += 1,
            SendOutcome::Closed => self.skipped += 1,
            SendOutcome::Full => {
                self.skipped += 1;
                self.dropped += 1;
            }
        }
    }
}

/// Encode once and queue the same frame on every recipient.
pub fn deliver<'a>(
    envelope: &Envelope,
    recipients: impl IntoIterator<Item = &'a ConnectionHandle>,
) -> Delivery {
    let frame = encode(envelope);
    let mut delivery = Delivery::default();
    for conn in recipients {
        delivery.record(conn.send_frame(frame.clone()));
    }
    delivery
}

pub fn send_to(envelope: &Envelope, conn: &ConnectionHandle) -> Delivery {
    deliver(envelope, std::iter::once(conn))
}
