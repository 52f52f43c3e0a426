//! # AMEP
//!
//! Client core for the AMEP teacher dashboard.
//!
//! - [`amep_session`]: who is logged in, token storage, and coalesced
//!   access-token refresh
//! - [`amep_transport`]: the identity API (`/auth/*`) over HTTP
//! - [`amep_dashboard`]: classroom analytics snapshots on a timer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use amep::prelude::*;
//!
//! # async fn run() -> Result<(), AmepError> {
//! amep::init_tracing();
//!
//! let client = AmepClient::builder()
//!     .base_url("http://localhost:8000/api")
//!     .token_file("tokens.json")
//!     .build()
//!     .await?;
//!
//! if !client.session().is_authenticated() {
//!     client.session().login("teacher@school.edu", "secret").await?;
//! }
//!
//! for alert in client.dashboard().current().alerts() {
//!     println!("{alert}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{AmepClient, AmepClientBuilder, ClientSession, ClientTokenStore};
pub use error::AmepError;

pub use amep_dashboard;
pub use amep_protocol;
pub use amep_session;
pub use amep_transport;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a formatted log subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

pub mod prelude {
    pub use crate::{AmepClient, AmepClientBuilder, AmepError, ClientSession};
    pub use amep_dashboard::{
        Alert, DashboardFeed, DashboardSnapshot, FeedConfig, MasteryBand, Recommendation,
    };
    pub use amep_protocol::{NewAccount, User};
    pub use amep_session::{SessionManager, SessionSnapshot, TokenStore};
    pub use amep_transport::{AuthApi, TransportError};
}
