//! Authenticated session management for the AMEP client.
//!
//! This crate handles the lifecycle of a logged-in teacher:
//!
//! 1. **Token storage**: persisting the access/refresh token pair
//!    ([`TokenStore`] trait, [`MemoryTokenStore`], [`FileTokenStore`])
//! 2. **Session tracking**: knowing who is logged in ([`SessionManager`],
//!    observed through [`SessionSnapshot`])
//! 3. **Refresh**: minting a new access token, with concurrent refresh
//!    requests collapsed into one exchange
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← calls login/logout, watches the snapshot
//!     ↕
//! Session Layer (this crate)  ← owns tokens and the current user
//!     ↕
//! Transport Layer (below)  ← AuthApi: the five /auth endpoints
//! ```

mod error;
mod manager;
mod session;
mod store;

pub use error::{SessionError, StoreError};
pub use manager::SessionManager;
pub use session::SessionSnapshot;
pub use store::{FileTokenStore, MemoryTokenStore, TokenSlot, TokenStore};
