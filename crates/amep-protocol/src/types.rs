//! Request and response bodies for the identity API.
//!
//! Every type here is something that gets serialized to JSON, sent over
//! HTTP, and deserialized on the other side.
//!
//! ```text
//! GET  /auth/me        → User
//! POST /auth/login     LoginRequest   → AuthResponse
//! POST /auth/register  NewAccount     → AuthResponse
//! POST /auth/logout                   → (ignored)
//! POST /auth/refresh   RefreshRequest → RefreshResponse
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The authenticated principal, as returned by the server.
///
/// The shape of a user record is owned by the API, not by this client.
/// We only care whether a user is present or not, so the record is kept
/// as an opaque JSON value and handed back to callers unchanged.
///
/// `#[serde(transparent)]` makes `User(json!({"id": 1}))` serialize as
/// `{"id": 1}`, not as `[{"id": 1}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(pub Value);

impl User {
    /// Wraps a raw JSON record.
    pub fn new(record: Value) -> Self {
        Self(record)
    }

    /// Looks up a top-level field of the record.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrows the raw record.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper and returns the raw record.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Prints the `id` field when present, for log lines like
/// `session established user=42`.
impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get("id") {
            Some(Value::String(id)) => write!(f, "{id}"),
            Some(id) => write!(f, "{id}"),
            None => write!(f, "<anonymous>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Login / register
// ---------------------------------------------------------------------------

/// Body of `POST /auth/login`.
///
/// `Debug` is implemented by hand so the password never ends up in a log.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`.
///
/// Account fields are defined by the server (name, email, role, school...),
/// so the payload is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewAccount(pub Value);

impl NewAccount {
    pub fn new(fields: Value) -> Self {
        Self(fields)
    }
}

/// Response of both `POST /auth/login` and `POST /auth/register`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    /// Checks that both tokens are usable.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if either token is empty.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "empty access_token in auth response".into(),
            ));
        }
        if self.refresh_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "empty refresh_token in auth response".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response of `POST /auth/refresh`. Only the access token is rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

impl RefreshResponse {
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the token is empty.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "empty access_token in refresh response".into(),
            ));
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
