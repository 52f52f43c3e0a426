//! Byte encoding for wire bodies and the on-disk token record.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns values into bytes and back.
///
/// The HTTP transport decodes response bodies through a `Codec`, and the
/// file token store uses one for its record, so both agree on the format.
/// Implementations must be shareable across tasks.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// [`ProtocolError::Encode`] if `value` cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] for malformed or truncated input, or input
    /// of the wrong shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// The identity API speaks JSON, and the token file is JSON so that it can
/// be inspected by hand when debugging a stuck login.
///
/// ## Example
///
/// ```rust
/// use amep_protocol::{Codec, JsonCodec, RefreshRequest};
///
/// let codec = JsonCodec;
/// let request = RefreshRequest { refresh_token: "r-1".into() };
///
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: RefreshRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        // Pretty output: the only on-disk user is the token file.
        serde_json::to_vec_pretty(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResponse;

    #[test]
    fn test_decode_malformed_json_returns_decode_error() {
        let result: Result<AuthResponse, _> = JsonCodec.decode(b"{not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_missing_field_returns_decode_error() {
        // A login response without a refresh token is unusable.
        let body = br#"{"user": {"id": 1}, "access_token": "a"}"#;

        let result: Result<AuthResponse, _> = JsonCodec.decode(body);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_readable_json() {
        let bytes = JsonCodec
            .encode(&serde_json::json!({"access_token": "a"}))
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("\"access_token\": \"a\""));
    }
}
