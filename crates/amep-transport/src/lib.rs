//! Transport abstraction for the AMEP identity API.
//!
//! Provides the [`AuthApi`] trait (the five auth endpoints the session
//! layer depends on) so that the session manager never knows whether it
//! is talking to a real server or a test double.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpAuthApi`], a `reqwest` implementation

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpAuthApi, HttpConfig};

use std::future::Future;
use std::sync::Arc;

use amep_protocol::{
    AuthResponse, LoginRequest, NewAccount, RefreshRequest, RefreshResponse,
    User,
};

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const ME: &str = "/auth/me";
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const LOGOUT: &str = "/auth/logout";
    pub const REFRESH: &str = "/auth/refresh";
}

/// The identity API as seen by the session layer.
///
/// Every method maps to exactly one HTTP call. Implementations must not
/// retry on their own; retry policy belongs to the caller.
///
/// The returned futures are `Send` so the session manager can drive a
/// refresh on a spawned Tokio task.
pub trait AuthApi: Send + Sync + 'static {
    /// `GET /auth/me` with the given bearer token.
    fn me(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<User, TransportError>> + Send;

    /// `POST /auth/login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, TransportError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        account: &NewAccount,
    ) -> impl Future<Output = Result<AuthResponse, TransportError>> + Send;

    /// `POST /auth/logout`, authenticated when a token is available.
    fn logout(
        &self,
        access_token: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// `POST /auth/refresh`.
    fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> impl Future<Output = Result<RefreshResponse, TransportError>> + Send;
}

/// Lets callers keep their own handle to a shared API (e.g. a test double
/// that counts calls) while the session manager owns another.
impl<T: AuthApi> AuthApi for Arc<T> {
    fn me(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<User, TransportError>> + Send {
        (**self).me(access_token)
    }

    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, TransportError>> + Send {
        (**self).login(request)
    }

    fn register(
        &self,
        account: &NewAccount,
    ) -> impl Future<Output = Result<AuthResponse, TransportError>> + Send {
        (**self).register(account)
    }

    fn logout(
        &self,
        access_token: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).logout(access_token)
    }

    fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> impl Future<Output = Result<RefreshResponse, TransportError>> + Send {
        (**self).refresh(request)
    }
}
