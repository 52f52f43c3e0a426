//! Unified error type for the AMEP client.

use amep_dashboard::DashboardError;
use amep_protocol::ProtocolError;
use amep_session::{SessionError, StoreError};
use amep_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Each variant has a `#[from]` impl, so `?` converts sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum AmepError {
    /// The identity API failed or rejected a request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login, registration, or token persistence failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The dashboard feed is no longer running.
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}
