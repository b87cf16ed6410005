//! Protobuf schema types (package `emdr_messages`).
//!
//! Kept in sync by hand with `proto/emdr_messages.proto`, which the browser
//! peers compile with their own toolchain.

/// Outermost wire message. Exactly one `message` case is expected per frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WebSocketMessage {
    #[prost(oneof = "web_socket_message::Message", tags = "1, 2, 3, 4, 5")]
    pub message: Option<web_socket_message::Message>,
}

pub mod web_socket_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        CreateSessionRequest(super::CreateSessionRequest),
        #[prost(message, tag = "2")]
        CreateSessionResponse(super::CreateSessionResponse),
        #[prost(message, tag = "3")]
        JoinSessionRequest(super::JoinSessionRequest),
        #[prost(message, tag = "4")]
        JoinSessionResponse(super::JoinSessionResponse),
        #[prost(message, tag = "5")]
        Params(super::Params),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSessionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSessionResponse {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
    #[prost(string, tag = "2")]
    pub session_url: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinSessionRequest {
    #[prost(string, tag = "1")]
    pub sid: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinSessionResponse {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Params {
    #[prost(int32, tag = "1")]
    pub size: i32,
    #[prost(int32, tag = "2")]
    pub speed: i32,
    #[prost(string, tag = "3")]
    pub color: String,
    #[prost(string, tag = "4")]
    pub sid: String,
}

/// Shadow of `WebSocketMessage` that keeps every occurrence of each oneof tag.
///
/// prost resolves a oneof by "last case wins", which hides frames carrying more
/// than one case. Decoding the same bytes as repeated raw payloads lets the codec
/// count how many distinct cases were actually on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct VariantProbe {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub create_session_request: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub create_session_response: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub join_session_request: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub join_session_response: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub params: Vec<Vec<u8>>,
}

impl VariantProbe {
    /// Number of distinct oneof cases present.
    pub(crate) fn populated_cases(&self) -> usize {
        [
            &self.create_session_request,
            &self.create_session_response,
            &self.join_session_request,
            &self.join_session_response,
            &self.params,
        ]
        .iter()
        .filter(|occurrences| !occurrences.is_empty())
        .count()
    }
}
