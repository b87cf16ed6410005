use emdr_wire::DecodeError;

/// Why an inbound frame was dropped. None of these close the connection.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    MalformedEnvelope(DecodeError),

    /// A response-only case arrived from a peer.
    #[error("unexpected inbound {0}")]
    UnknownVariant(&'static str),

    #[error("unknown session {0:?}")]
    UnknownSession(String),

    #[error("params update without a session id")]
    MissingSid,
}

impl From<DecodeError> for DispatchError {
    /// A params frame without a sid is unroutable rather than malformed.
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MissingField {
                variant: "params",
                field: "sid",
            } => DispatchError::MissingSid,
            other => DispatchError::MalformedEnvelope(other),
        }
    }
}

impl DispatchError {
    /// Short label for log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::MalformedEnvelope(_) => "malformed_envelope",
            DispatchError::UnknownVariant(_) => "unknown_variant",
            DispatchError::UnknownSession(_) => "unknown_session",
            DispatchError::MissingSid => "missing_sid",
        }
    }
}
