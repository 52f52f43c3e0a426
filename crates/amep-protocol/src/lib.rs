//! Wire protocol for the AMEP identity API.
//!
//! This crate defines the "language" the client speaks with the auth
//! endpoints:
//!
//! - **Types** ([`User`], [`LoginRequest`], [`AuthResponse`], etc.):
//!   the request and response bodies that travel over HTTP.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how values are converted
//!   to/from bytes. The token store uses it for its on-disk file.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (HTTP) → Protocol (request/response bodies) → Session (who is logged in)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    AuthResponse, LoginRequest, NewAccount, RefreshRequest, RefreshResponse,
    User,
};
