use amep_protocol::ProtocolError;

/// Errors that can occur talking to the identity API.
///
/// Callers of `login`/`register` receive these unchanged, so the variants
/// are shaped around what a UI would want to tell the user apart.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached (DNS, refused connection, TLS).
    #[error("identity API unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server rejected the credentials or token (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Any other non-success status. `message` is the raw response body,
    /// which usually carries the server's validation message.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("bad response body: {0}")]
    Decode(#[source] ProtocolError),

    /// Lower-level HTTP client failure.
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    /// Whether the server answered and said "no" to the credentials,
    /// as opposed to the request never getting an answer.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Api { status: 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth_rejection_unauthorized_true() {
        assert!(TransportError::Unauthorized.is_auth_rejection());
        assert!(
            TransportError::Api {
                status: 403,
                message: "forbidden".into()
            }
            .is_auth_rejection()
        );
    }

    #[test]
    fn test_is_auth_rejection_network_failure_false() {
        assert!(!TransportError::Timeout.is_auth_rejection());
        assert!(!TransportError::Unavailable("refused".into()).is_auth_rejection());
    }

    #[test]
    fn test_api_error_display_includes_status_and_body() {
        let err = TransportError::Api {
            status: 422,
            message: "email already registered".into(),
        };

        assert_eq!(err.to_string(), "API error 422: email already registered");
    }
}
