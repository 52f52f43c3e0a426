//! The session manager: owns the logged-in user and their tokens.
//!
//! Responsibilities:
//! - Resolving a stored session at startup ([`SessionManager::initialize`])
//! - Logging in / registering and persisting the issued tokens
//! - Logging out (best-effort server notification, unconditional local purge)
//! - Refreshing the access token, with concurrent refreshes coalesced into
//!   a single exchange
//!
//! # Concurrency note
//!
//! A `SessionManager` is a cheap `Arc` handle: clone it into every task that
//! needs the session. All clones share the same tokens, snapshot channel,
//! and in-flight refresh marker. Nothing is process-global, so independent
//! managers (one per test, say) never interfere.
//!
//! Token writes and the credential epoch are guarded by one std mutex that
//! is never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amep_protocol::{AuthResponse, LoginRequest, NewAccount, RefreshRequest, User};
use amep_transport::{AuthApi, TransportError};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use crate::{SessionError, SessionSnapshot, StoreError, TokenSlot, TokenStore};

/// The pending outcome every concurrent refresh caller awaits.
type SharedRefresh = Shared<BoxFuture<'static, bool>>;

/// The in-flight refresh marker.
struct InFlight {
    /// Distinguishes this exchange from any later one, so a finished
    /// exchange never clears a marker it doesn't own.
    id: u64,
    outcome: SharedRefresh,
}

/// Manages the authenticated session of one client.
///
/// ## Lifecycle
///
/// ```text
/// initialize() ──(stored token valid)──→ [Authenticated] ──logout()──→ [Anonymous]
///      │                                   ↑      │
///      └──(no token / rejected)──→ [Anonymous]    └──refresh fails──→ [Anonymous]
///                                      │
///                          login() / register()
/// ```
///
/// ## Example
///
/// ```rust,ignore
/// let session = SessionManager::new(api, FileTokenStore::new("tokens.json"));
/// session.initialize().await;
/// if !session.is_authenticated() {
///     session.login("teacher@school.edu", "secret").await?;
/// }
/// ```
pub struct SessionManager<A: AuthApi, S: TokenStore> {
    inner: Arc<Inner<A, S>>,
}

impl<A: AuthApi, S: TokenStore> Clone for SessionManager<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A, S> {
    api: A,
    store: S,

    /// Publishes every change to the observable session.
    state: watch::Sender<SessionSnapshot>,

    /// At most one refresh exchange at a time.
    refresh: Mutex<Option<InFlight>>,

    /// Credential epoch: advanced whenever login, register, or a purge
    /// replaces the stored tokens. Held while writing tokens, so a refresh
    /// started under an older epoch can detect that it was superseded.
    epoch: Mutex<u64>,

    next_refresh_id: AtomicU64,
}

/// Locks a std mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: AuthApi, S: TokenStore> SessionManager<A, S> {
    /// Creates a manager in the `loading` state. Call
    /// [`initialize`](Self::initialize) once at startup.
    pub fn new(api: A, store: S) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state,
                refresh: Mutex::new(None),
                epoch: Mutex::new(0),
                next_refresh_id: AtomicU64::new(1),
            }),
        }
    }

    // -- Observation ------------------------------------------------------

    /// The current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// The current user, if logged in.
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// `true` until [`initialize`](Self::initialize) has completed.
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// `true` when a user is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Subscribes to session changes. The receiver sees the current
    /// snapshot immediately and is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// The stored access token, for callers attaching it to requests.
    ///
    /// A storage failure is logged and reported as "no token".
    pub fn access_token(&self) -> Option<String> {
        self.inner.read_slot(TokenSlot::AccessToken)
    }

    /// `true` while a refresh exchange is pending.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.inner.refresh).is_some()
    }

    // -- Operations -------------------------------------------------------

    /// Resolves the stored session, if any, against `GET /auth/me`.
    ///
    /// - No stored access token → no network call, session stays empty.
    /// - Server returns the user → session populated.
    /// - Any failure → both tokens purged, session empty.
    ///
    /// The `loading` flag is cleared on every exit path.
    pub async fn initialize(&self) {
        let _loading = LoadingGuard {
            state: &self.inner.state,
        };

        let token = match self.inner.store.get(TokenSlot::AccessToken) {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("no stored access token, starting anonymous");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored access token");
                self.inner.clear_credentials("unreadable token store");
                return;
            }
        };

        let epoch = self.inner.current_epoch();
        match self.inner.api.me(&token).await {
            Ok(user) => {
                let guard = lock(&self.inner.epoch);
                if *guard != epoch {
                    tracing::debug!("stored session resolved after credentials changed, ignoring");
                    return;
                }
                tracing::info!(%user, "restored stored session");
                self.inner.state.send_modify(|s| s.user = Some(user));
            }
            Err(e) if e.is_auth_rejection() => {
                tracing::info!(error = %e, "stored session rejected, clearing tokens");
                self.inner.purge(Some(epoch), "stored session rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not verify stored session, clearing tokens");
                self.inner.purge(Some(epoch), "stored session unverifiable");
            }
        }
    }

    /// Logs in with email and password.
    ///
    /// On success both tokens are stored and the session is populated with
    /// the user exactly as the server returned it.
    ///
    /// # Errors
    /// - [`SessionError::Transport`]: the endpoint failed; stored tokens
    ///   and session are untouched.
    /// - [`SessionError::Store`]: tokens could not be persisted; the
    ///   previously stored tokens were restored.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let request = LoginRequest::new(email, password);
        let response = self.inner.api.login(&request).await.inspect_err(|e| {
            tracing::debug!(email, error = %e, "login rejected");
        })?;
        self.inner.establish(response, "login")
    }

    /// Registers a new account. Same contract as [`login`](Self::login).
    ///
    /// # Errors
    /// See [`login`](Self::login).
    pub async fn register(
        &self,
        account: NewAccount,
    ) -> Result<User, SessionError> {
        let response = self.inner.api.register(&account).await.inspect_err(|e| {
            tracing::debug!(error = %e, "registration rejected");
        })?;
        self.inner.establish(response, "register")
    }

    /// Logs out.
    ///
    /// The server is notified first, best-effort: a failed notification is
    /// logged and otherwise ignored so it can never block local cleanup.
    /// Both tokens are then purged and the session cleared, always.
    pub async fn logout(&self) {
        self.inner.logout().await;
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Returns `true` if a new access token is now stored.
    ///
    /// - No refresh token stored → `false`, no network call, no side effects.
    /// - A refresh already in flight → awaits and returns that same outcome.
    /// - Otherwise starts an exchange. On success the new access token is
    ///   stored; on failure the session is logged out.
    ///
    /// The exchange runs on its own task, so it completes (and its side
    /// effects land) even if every caller stops waiting.
    pub async fn refresh_access_token(&self) -> bool {
        match Inner::join_or_start_refresh(&self.inner) {
            Some(outcome) => outcome.await,
            None => {
                tracing::debug!("refresh requested without a stored refresh token");
                false
            }
        }
    }
}

impl<A: AuthApi, S: TokenStore> Inner<A, S> {
    fn current_epoch(&self) -> u64 {
        *lock(&self.epoch)
    }

    fn read_slot(&self, slot: TokenSlot) -> Option<String> {
        self.store.get(slot).unwrap_or_else(|e| {
            tracing::warn!(%slot, error = %e, "could not read token");
            None
        })
    }

    /// Returns the pending refresh, starting one if none is in flight.
    /// `None` when no refresh token is stored.
    ///
    /// Lock order is always `epoch` then `refresh`.
    fn join_or_start_refresh(this: &Arc<Self>) -> Option<SharedRefresh> {
        let epoch_guard = lock(&this.epoch);
        let refresh_token = this.read_slot(TokenSlot::RefreshToken)?;

        let mut slot = lock(&this.refresh);
        if let Some(in_flight) = slot.as_ref() {
            tracing::debug!(refresh_id = in_flight.id, "joining in-flight refresh");
            return Some(in_flight.outcome.clone());
        }

        let id = this.next_refresh_id.fetch_add(1, Ordering::Relaxed);
        let epoch = *epoch_guard;
        tracing::debug!(refresh_id = id, "starting refresh exchange");

        let task = tokio::spawn({
            let inner = Arc::clone(this);
            async move {
                let refreshed = inner.exchange(refresh_token, epoch).await;
                // Cleared before any caller observes the outcome.
                inner.clear_refresh(id);
                refreshed
            }
        });

        let inner = Arc::clone(this);
        let outcome = async move {
            let refreshed = task.await.unwrap_or_else(|e| {
                tracing::error!(refresh_id = id, error = %e, "refresh task failed");
                false
            });
            inner.clear_refresh(id);
            refreshed
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            outcome: outcome.clone(),
        });
        Some(outcome)
    }

    /// Clears the marker if it still belongs to exchange `id`.
    fn clear_refresh(&self, id: u64) {
        let mut slot = lock(&self.refresh);
        if slot.as_ref().is_some_and(|f| f.id == id) {
            *slot = None;
        }
    }

    /// The body of one refresh exchange.
    async fn exchange(&self, refresh_token: String, epoch: u64) -> bool {
        let request = RefreshRequest { refresh_token };
        let result = self
            .api
            .refresh(&request)
            .await
            .and_then(|resp| resp.validate().map(|()| resp).map_err(TransportError::Decode));

        let failure = {
            let guard = lock(&self.epoch);
            if *guard != epoch {
                tracing::info!("refresh superseded by newer credentials, discarding result");
                return false;
            }
            match result {
                Ok(resp) => match self.store.set(TokenSlot::AccessToken, &resp.access_token) {
                    Ok(()) => None,
                    Err(e) => Some(e.to_string()),
                },
                Err(e) => Some(e.to_string()),
            }
        };

        match failure {
            None => {
                tracing::info!("access token refreshed");
                true
            }
            Some(error) => {
                tracing::warn!(%error, "refresh failed, logging out");
                self.notify_logout().await;
                self.purge(Some(epoch), "refresh failed");
                false
            }
        }
    }

    /// Persists a freshly issued token pair and publishes the user.
    fn establish(
        &self,
        response: AuthResponse,
        via: &'static str,
    ) -> Result<User, SessionError> {
        response.validate().map_err(TransportError::Decode)?;
        let user = response.user.clone();
        {
            let mut epoch = lock(&self.epoch);
            self.persist_pair(&response)?;
            *epoch += 1;
            // Any pending refresh used the old refresh token.
            lock(&self.refresh).take();
            // Tokens and user change together under the epoch lock.
            self.state.send_modify(|s| s.user = Some(user.clone()));
        }

        tracing::info!(%user, via, "session established");
        Ok(user)
    }

    /// Writes both tokens, restoring the previous pair if either write fails.
    fn persist_pair(&self, response: &AuthResponse) -> Result<(), StoreError> {
        let previous_access = self.read_slot(TokenSlot::AccessToken);
        let previous_refresh = self.read_slot(TokenSlot::RefreshToken);

        let written = self
            .store
            .set(TokenSlot::AccessToken, &response.access_token)
            .and_then(|()| self.store.set(TokenSlot::RefreshToken, &response.refresh_token));

        if let Err(e) = written {
            for (slot, value) in [
                (TokenSlot::AccessToken, previous_access),
                (TokenSlot::RefreshToken, previous_refresh),
            ] {
                let restored = match value {
                    Some(v) => self.store.set(slot, &v),
                    None => self.store.remove(slot),
                };
                if let Err(restore_err) = restored {
                    tracing::warn!(%slot, error = %restore_err, "could not restore previous token");
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn logout(&self) {
        self.notify_logout().await;
        self.clear_credentials("logout");
    }

    /// Tells the server the session is over. Failures are only logged.
    async fn notify_logout(&self) {
        let access_token = self.read_slot(TokenSlot::AccessToken);
        if let Err(e) = self.api.logout(access_token.as_deref()).await {
            tracing::warn!(error = %e, "logout notification failed");
        }
    }

    /// Purges both tokens, drops any pending refresh, and clears the user.
    fn clear_credentials(&self, reason: &'static str) {
        self.purge(None, reason);
    }

    /// [`clear_credentials`](Self::clear_credentials), skipped when
    /// `expected` is given and the epoch has moved past it. Returns whether
    /// the purge happened.
    fn purge(&self, expected: Option<u64>, reason: &'static str) -> bool {
        {
            let mut epoch = lock(&self.epoch);
            if expected.is_some_and(|e| e != *epoch) {
                tracing::debug!(reason, "credentials changed meanwhile, not clearing");
                return false;
            }
            for slot in TokenSlot::ALL {
                if let Err(e) = self.store.remove(slot) {
                    tracing::warn!(%slot, error = %e, "could not remove token");
                }
            }
            *epoch += 1;
            lock(&self.refresh).take();
            self.state.send_modify(|s| s.user = None);
        }
        tracing::info!(reason, "session cleared");
        true
    }
}

/// Clears the `loading` flag when dropped, on every exit path of
/// `initialize` (including early returns and cancellation).
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionSnapshot>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

// =========================================================================
// Tests
// =========================================================================
