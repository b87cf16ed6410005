//! Domain envelope and the encode/decode pair.
//!
//! Wire format: one protobuf `WebSocketMessage` per transport message, with
//! exactly one `message` oneof case populated.

use bytes::Bytes;
use prost::Message as _;

use crate::error::DecodeError;
use crate::proto::{self, VariantProbe, web_socket_message::Message as ProtoMessage};

/// Animation parameters shared by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Circle diameter in pixels.
    pub size: i32,
    /// Horizontal speed in pixels per second.
    pub speed: i32,
    /// `#RRGGBB` fill color; empty when the sender did not set one.
    pub color: String,
    /// Session the update belongs to.
    pub sid: String,
}

/// A decoded wire message. Exactly one case per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    CreateSessionRequest,
    CreateSessionResponse { accepted: bool, session_url: String },
    JoinSessionRequest { sid: String },
    JoinSessionResponse { accepted: bool },
    Params(Params),
}

/// What a peer UI should do with an inbound envelope.
///
/// Join acceptance restarts the motion from its starting position; a params
/// update is applied in place.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    SessionCreated { session_url: String },
    Joined { accepted: bool },
    ParamsUpdated(Params),
}

impl PeerEvent {
    pub fn restarts_motion(&self) -> bool {
        matches!(self, PeerEvent::Joined { accepted: true })
    }
}

impl Envelope {
    /// Snake-case name of the active case, as it appears in the schema.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Envelope::CreateSessionRequest => "create_session_request",
            Envelope::CreateSessionResponse { .. } => "create_session_response",
            Envelope::JoinSessionRequest { .. } => "join_session_request",
            Envelope::JoinSessionResponse { .. } => "join_session_response",
            Envelope::Params(_) => "params",
        }
    }

    /// Cases only the broker is supposed to send.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Envelope::CreateSessionResponse { .. } | Envelope::JoinSessionResponse { .. }
        )
    }

    /// Classify an envelope received by a peer. Requests map to `None`.
    pub fn peer_event(&self) -> Option<PeerEvent> {
        match self {
            Envelope::CreateSessionResponse {
                accepted: true,
                session_url,
            } => Some(PeerEvent::SessionCreated {
                session_url: session_url.clone(),
            }),
            Envelope::JoinSessionResponse { accepted } => Some(PeerEvent::Joined {
                accepted: *accepted,
            }),
            Envelope::Params(params) => Some(PeerEvent::ParamsUpdated(params.clone())),
            _ => None,
        }
    }
}

impl From<Envelope> for proto::WebSocketMessage {
    fn from(envelope: Envelope) -> Self {
        let message = match envelope {
            Envelope::CreateSessionRequest => {
                ProtoMessage::CreateSessionRequest(proto::CreateSessionRequest {})
            }
            Envelope::CreateSessionResponse {
                accepted,
                session_url,
            } => ProtoMessage::CreateSessionResponse(proto::CreateSessionResponse {
                accepted,
                session_url,
            }),
            Envelope::JoinSessionRequest { sid } => {
                ProtoMessage::JoinSessionRequest(proto::JoinSessionRequest { sid })
            }
            Envelope::JoinSessionResponse { accepted } => {
                ProtoMessage::JoinSessionResponse(proto::JoinSessionResponse { accepted })
            }
            Envelope::Params(Params {
                size,
                speed,
                color,
                sid,
            }) => ProtoMessage::Params(proto::Params {
                size,
                speed,
                color,
                sid,
            }),
        };
        proto::WebSocketMessage {
            message: Some(message),
        }
    }
}

impl TryFrom<proto::WebSocketMessage> for Envelope {
    type Error = DecodeError;

    fn try_from(msg: proto::WebSocketMessage) -> Result<Self, Self::Error> {
        let envelope = match msg.message.ok_or(DecodeError::Empty)? {
            ProtoMessage::CreateSessionRequest(_) => Envelope::CreateSessionRequest,
            ProtoMessage::CreateSessionResponse(resp) => {
                if resp.session_url.is_empty() {
                    return Err(DecodeError::MissingField {
                        variant: "create_session_response",
                        field: "session_url",
                    });
                }
                Envelope::CreateSessionResponse {
                    accepted: resp.accepted,
                    session_url: resp.session_url,
                }
            }
            ProtoMessage::JoinSessionRequest(req) => Envelope::JoinSessionRequest { sid: req.sid },
            ProtoMessage::JoinSessionResponse(resp) => Envelope::JoinSessionResponse {
                accepted: resp.accepted,
            },
            ProtoMessage::Params(p) => {
                if p.sid.is_empty() {
                    return Err(DecodeError::MissingField {
                        variant: "params",
                        field: "sid",
                    });
                }
                Envelope::Params(Params {
                    size: p.size,
                    speed: p.speed,
                    color: p.color,
                    sid: p.sid,
                })
            }
        };
        Ok(envelope)
    }
}

/// Encode an envelope into one wire frame.
pub fn encode(envelope: &Envelope) -> Bytes {
    let msg = proto::WebSocketMessage::from(envelope.clone());
    Bytes::from(msg.encode_to_vec())
}

/// Decode and validate one wire frame.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let probe = VariantProbe::decode(bytes)?;
    let count = probe.populated_cases();
    if count > 1 {
        return Err(DecodeError::MultipleVariants { count });
    }
    let msg = proto::WebSocketMessage::decode(bytes)?;
    Envelope::try_from(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    fn sample_params() -> Params {
        Params {
            size: 80,
            speed: 400,
            color: "#ff0000".to_string(),
            sid: "S1".to_string(),
        }
    }

    #[test]
    fn params_roundtrip() {
        let envelope = Envelope::Params(sample_params());
        let decoded = decode(&encode(&envelope)).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn params_with_varint_numbers_decode() {
        // params { size: 1, speed: 2, color: "blue", sid: "S1" } as encoded by browser peers
        let bytes = [
            0x2a, 0x0e, 0x08, 0x01, 0x10, 0x02, 0x1a, 0x04, b'b', b'l', b'u', b'e', 0x22, 0x02,
            b'S', b'1',
        ];
        assert_eq!(
            decode(&bytes).unwrap(),
            Envelope::Params(Params {
                size: 1,
                speed: 2,
                color: "blue".to_string(),
                sid: "S1".to_string(),
            })
        );
    }

    #[test]
    fn empty_create_request_still_carries_its_case() {
        let bytes = encode(&Envelope::CreateSessionRequest);
        assert!(!bytes.is_empty());
        assert_eq!(decode(&bytes).unwrap(), Envelope::CreateSessionRequest);
    }

    #[test]
    fn empty_frame_is_rejected() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff]),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_fields_only_count_as_empty() {
        // field 9, varint 1
        assert!(matches!(decode(&[0x48, 0x01]), Err(DecodeError::Empty)));
    }

    #[test]
    fn two_cases_in_one_frame_are_rejected() {
        let mut bytes = encode(&Envelope::CreateSessionRequest).to_vec();
        bytes.extend_from_slice(&encode(&Envelope::JoinSessionRequest {
            sid: "abc".to_string(),
        }));
        // prost alone would keep the last case
        assert!(proto::WebSocketMessage::decode(bytes.as_slice()).is_ok());
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::MultipleVariants { count: 2 })
        ));
    }

    #[test]
    fn repeated_same_case_is_merged() {
        let mut bytes = encode(&Envelope::JoinSessionRequest {
            sid: "first".to_string(),
        })
        .to_vec();
        bytes.extend_from_slice(&encode(&Envelope::JoinSessionRequest {
            sid: "second".to_string(),
        }));
        assert_eq!(
            decode(&bytes).unwrap(),
            Envelope::JoinSessionRequest {
                sid: "second".to_string()
            }
        );
    }

    #[test]
    fn params_without_sid_is_rejected() {
        let msg = proto::WebSocketMessage {
            message: Some(ProtoMessage::Params(proto::Params {
                size: 10,
                speed: 20,
                color: "#00ff00".to_string(),
                sid: String::new(),
            })),
        };
        let err = decode(&msg.encode_to_vec()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingField {
                variant: "params",
                field: "sid"
            }
        ));
    }

    #[test]
    fn params_missing_numbers_default_to_zero() {
        let msg = proto::WebSocketMessage {
            message: Some(ProtoMessage::Params(proto::Params {
                sid: "S1".to_string(),
                ..Default::default()
            })),
        };
        let decoded = decode(&msg.encode_to_vec()).unwrap();
        assert_eq!(
            decoded,
            Envelope::Params(Params {
                size: 0,
                speed: 0,
                color: String::new(),
                sid: "S1".to_string(),
            })
        );
    }

    #[test]
    fn create_response_without_url_is_rejected() {
        let msg = proto::WebSocketMessage {
            message: Some(ProtoMessage::CreateSessionResponse(
                proto::CreateSessionResponse {
                    accepted: true,
                    session_url: String::new(),
                },
            )),
        };
        assert!(matches!(
            decode(&msg.encode_to_vec()),
            Err(DecodeError::MissingField { field: "session_url", .. })
        ));
    }

    #[test]
    fn join_request_with_empty_sid_decodes() {
        let envelope = Envelope::JoinSessionRequest { sid: String::new() };
        assert_eq!(decode(&encode(&envelope)).unwrap(), envelope);
    }

    #[test]
    fn wrong_wire_type_for_a_case_is_malformed() {
        // field 5 (params) as varint instead of length-delimited
        assert!(matches!(
            decode(&[0x28, 0x01]),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn response_cases() {
        assert!(Envelope::JoinSessionResponse { accepted: true }.is_response());
        assert!(!Envelope::CreateSessionRequest.is_response());
        assert!(!Envelope::Params(sample_params()).is_response());
    }

    #[test]
    fn only_accepted_join_restarts_motion() {
        let joined = Envelope::JoinSessionResponse { accepted: true }
            .peer_event()
            .unwrap();
        assert!(joined.restarts_motion());

        let rejected = Envelope::JoinSessionResponse { accepted: false }
            .peer_event()
            .unwrap();
        assert!(!rejected.restarts_motion());

        let update = Envelope::Params(sample_params()).peer_event().unwrap();
        assert!(!update.restarts_motion());
        assert_eq!(update, PeerEvent::ParamsUpdated(sample_params()));

        assert!(Envelope::CreateSessionRequest.peer_event().is_none());
    }
}
