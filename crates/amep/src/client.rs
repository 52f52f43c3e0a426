//! `AmepClient` builder.
//!
//! Ties the layers together: HTTP identity API → session manager →
//! dashboard feed.

use std::path::PathBuf;
use std::time::Duration;

use amep_dashboard::{DashboardFeed, FeedConfig};
use amep_session::{
    FileTokenStore, MemoryTokenStore, SessionManager, StoreError, TokenSlot, TokenStore,
};
use amep_transport::{HttpAuthApi, HttpConfig};

use crate::AmepError;

/// The session manager type an [`AmepClient`] runs.
pub type ClientSession = SessionManager<HttpAuthApi, ClientTokenStore>;

/// Token storage selected at build time.
#[derive(Debug)]
pub enum ClientTokenStore {
    Memory(MemoryTokenStore),
    File(FileTokenStore),
}

impl TokenStore for ClientTokenStore {
    fn get(&self, slot: TokenSlot) -> Result<Option<String>, StoreError> {
        match self {
            ClientTokenStore::Memory(store) => store.get(slot),
            ClientTokenStore::File(store) => store.get(slot),
        }
    }

    fn set(&self, slot: TokenSlot, value: &str) -> Result<(), StoreError> {
        match self {
            ClientTokenStore::Memory(store) => store.set(slot, value),
            ClientTokenStore::File(store) => store.set(slot, value),
        }
    }

    fn remove(&self, slot: TokenSlot) -> Result<(), StoreError> {
        match self {
            ClientTokenStore::Memory(store) => store.remove(slot),
            ClientTokenStore::File(store) => store.remove(slot),
        }
    }
}

/// Builder for an [`AmepClient`].
///
/// # Example
///
/// ```rust,ignore
/// let client = AmepClient::builder()
///     .base_url("https://amep.example.org/api")
///     .token_file("/var/lib/amep/tokens.json")
///     .build()
///     .await?;
///
/// if !client.session().is_authenticated() {
///     client.session().login("teacher@school.edu", "secret").await?;
/// }
/// let snapshot = client.dashboard().current();
/// ```
pub struct AmepClientBuilder {
    http: HttpConfig,
    token_file: Option<PathBuf>,
    feed: FeedConfig,
}

impl AmepClientBuilder {
    pub fn new() -> Self {
        Self {
            http: HttpConfig::default(),
            token_file: None,
            feed: FeedConfig::default(),
        }
    }

    /// Sets the identity API base URL.
    pub fn base_url(mut self, url: &str) -> Self {
        self.http.base_url = url.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = timeout;
        self
    }

    /// Persists tokens to `path`. Without this, tokens live in memory and
    /// the user must log in again on every start.
    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    /// How often the dashboard regenerates. Clamped to at least one second.
    pub fn dashboard_interval(mut self, interval: Duration) -> Self {
        self.feed.interval = interval;
        self
    }

    /// Makes dashboard data reproducible.
    pub fn dashboard_seed(mut self, seed: u64) -> Self {
        self.feed.seed = Some(seed);
        self
    }

    /// Builds the client, resolves any stored session, and starts the
    /// dashboard feed.
    ///
    /// A stored token that the server rejects is not an error: the client
    /// simply comes up anonymous.
    ///
    /// # Errors
    /// Returns [`AmepError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub async fn build(self) -> Result<AmepClient, AmepError> {
        let api = HttpAuthApi::new(self.http)?;
        tracing::debug!(base_url = %api.config().base_url, "identity API client built");

        let store = match self.token_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using file token store");
                ClientTokenStore::File(FileTokenStore::new(path))
            }
            None => ClientTokenStore::Memory(MemoryTokenStore::new()),
        };

        let session = SessionManager::new(api, store);
        session.initialize().await;

        let dashboard = DashboardFeed::spawn(self.feed);

        tracing::info!(
            authenticated = session.is_authenticated(),
            dashboard_interval_s = dashboard.interval().as_secs_f64(),
            "AMEP client ready"
        );

        Ok(AmepClient { session, dashboard })
    }
}

impl Default for AmepClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A ready AMEP client: the teacher's session plus the live dashboard.
pub struct AmepClient {
    session: ClientSession,
    dashboard: DashboardFeed,
}

impl AmepClient {
    pub fn builder() -> AmepClientBuilder {
        AmepClientBuilder::new()
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn dashboard(&self) -> &DashboardFeed {
        &self.dashboard
    }

    /// Stops the dashboard feed. The session is left as is; call
    /// [`SessionManager::logout`] first to end it.
    pub async fn shutdown(&self) -> Result<(), AmepError> {
        self.dashboard.shutdown().await?;
        tracing::info!("AMEP client shut down");
        Ok(())
    }
}
