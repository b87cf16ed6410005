//! Decode failures for inbound frames.

/// Why an inbound frame could not be turned into an [`Envelope`](crate::Envelope).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] prost::DecodeError),

    #[error("envelope carries no message variant")]
    Empty,

    #[error("envelope carries {count} message variants, expected exactly one")]
    MultipleVariants { count: usize },

    #[error("{variant} is missing required field `{field}`")]
    MissingField {
        variant: &'static str,
        field: &'static str,
    },
}
