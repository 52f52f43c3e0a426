//! The observable session state.

use amep_protocol::User;

/// What the rest of the application sees of the session.
///
/// Published through a `tokio::sync::watch` channel by the
/// [`SessionManager`](crate::SessionManager); every login, logout, refresh
/// failure, or startup resolution produces a new snapshot.
///
/// ```text
///   loading=true, user=None ──(initialize)──→ loading=false, user=Some/None
///                                                │
///              login/register ──→ user=Some ←────┤
///              logout/refresh failure ──→ user=None
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The current user, or `None` when nobody is logged in.
    pub user: Option<User>,

    /// `true` until the stored session (if any) has been verified at
    /// startup. UIs use this to avoid flashing the login screen.
    pub loading: bool,
}

impl SessionSnapshot {
    /// The state of a freshly constructed manager: nothing known yet.
    pub fn initial() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// `true` when a user is present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_initial_is_loading_and_unauthenticated() {
        let snap = SessionSnapshot::initial();

        assert!(snap.loading);
        assert!(!snap.is_authenticated());
    }

    #[test]
    fn test_is_authenticated_follows_user_presence() {
        let snap = SessionSnapshot {
            user: Some(User::new(json!({"id": 1}))),
            loading: false,
        };

        assert!(snap.is_authenticated());
    }
}
