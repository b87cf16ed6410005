//! Protobuf envelope codec shared by the broker and its peers.
//!
//! The browser host and clients exchange one `WebSocketMessage` per binary
//! WebSocket message. This crate owns the schema types, the [`Envelope`] sum
//! type the broker routes on, and the validation that turns raw bytes into it.

mod envelope;
mod error;
pub mod proto;

pub use envelope::{Envelope, Params, PeerEvent, decode, encode};
pub use error::DecodeError;
