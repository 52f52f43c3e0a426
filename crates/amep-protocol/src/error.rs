//! Wire-format errors.

/// A body or record could not be converted, or converted into something
/// the API contract forbids.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Common causes: malformed JSON, missing required fields such as
    /// `access_token`, or a truncated body.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed but violates the API contract, e.g. an empty
    /// access token in a login response.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
