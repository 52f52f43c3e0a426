//! Error types for the session layer.

use std::path::PathBuf;

use amep_protocol::ProtocolError;
use amep_transport::TransportError;

/// Errors surfaced by [`SessionManager`](crate::SessionManager) operations.
///
/// Only `login` and `register` return errors. `initialize`, `logout`, and
/// `refresh_access_token` handle every failure internally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity API rejected the request or could not be reached.
    /// The inner error is passed through unchanged so the caller can
    /// decide what to show the user.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server accepted the credentials but the tokens could not be
    /// persisted. Previously stored tokens were restored.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from a [`TokenStore`](crate::TokenStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token file exists but is not valid JSON.
    #[error("token file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ProtocolError,
    },

    /// The token record could not be serialized.
    #[error("could not encode tokens: {0}")]
    Encode(#[source] ProtocolError),
}
