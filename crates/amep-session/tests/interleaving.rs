//! Integration tests for login/logout interleaving across threads.
//!
//! One thread runs an operation with a thread-local subscriber whose layer
//! blocks on a chosen log event. While it is parked there, the test thread
//! runs the opposite operation to completion on its own runtime, then lets
//! the first thread finish. Whatever the interleaving, the published user
//! and the stored tokens must end up describing the same session.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use amep_protocol::{
    AuthResponse, LoginRequest, NewAccount, RefreshRequest, RefreshResponse, User,
};
use amep_session::{MemoryTokenStore, SessionManager, TokenSlot, TokenStore};
use amep_transport::{AuthApi, TransportError};
use serde_json::json;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// =========================================================================
// API double
// =========================================================================

struct OkApi;

impl AuthApi for OkApi {
    async fn me(&self, _access_token: &str) -> Result<User, TransportError> {
        Err(TransportError::Unauthorized)
    }

    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, TransportError> {
        Ok(AuthResponse {
            user: User::new(json!({"id": 3, "name": "C"})),
            access_token: "acc".into(),
            refresh_token: "ref".into(),
        })
    }

    async fn register(&self, _account: &NewAccount) -> Result<AuthResponse, TransportError> {
        Err(TransportError::Unauthorized)
    }

    async fn logout(&self, _access_token: Option<&str>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn refresh(&self, _request: &RefreshRequest) -> Result<RefreshResponse, TransportError> {
        Err(TransportError::Unauthorized)
    }
}

// =========================================================================
// Pausing layer
// =========================================================================

/// Parks the emitting thread the first time an event with `message` fires.
struct PauseAt {
    message: &'static str,
    reached: Mutex<Option<Sender<()>>>,
    resume: Mutex<Option<Receiver<()>>>,
}

impl<S: Subscriber> Layer<S> for PauseAt {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField(None);
        event.record(&mut message);
        if message.0.as_deref() != Some(self.message) {
            return;
        }
        let Some(reached) = self.reached.lock().unwrap().take() else {
            return;
        };
        reached.send(()).unwrap();
        if let Some(resume) = self.resume.lock().unwrap().take() {
            resume.recv().unwrap();
        }
    }
}

struct MessageField(Option<String>);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Manager = SessionManager<Arc<OkApi>, Arc<MemoryTokenStore>>;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Runs `first` on its own thread, parks it at `message`, runs `second` to
/// completion here, then resumes `first` and waits for it.
fn interleave<F1, F2, Fut1, Fut2>(mgr: &Manager, message: &'static str, first: F1, second: F2)
where
    F1: FnOnce(Manager) -> Fut1 + Send + 'static,
    Fut1: std::future::Future<Output = ()>,
    F2: FnOnce(Manager) -> Fut2,
    Fut2: std::future::Future<Output = ()>,
{
    let (reached_tx, reached_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel();

    let parked = mgr.clone();
    let handle = thread::spawn(move || {
        let layer = PauseAt {
            message,
            reached: Mutex::new(Some(reached_tx)),
            resume: Mutex::new(Some(resume_rx)),
        };
        let _default = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
        runtime().block_on(first(parked));
    });

    reached_rx.recv().expect("first operation should reach the pause point");
    runtime().block_on(second(mgr.clone()));
    resume_tx.send(()).unwrap();
    handle.join().expect("first operation should not panic");
}

fn setup() -> (Manager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let mgr = SessionManager::new(Arc::new(OkApi), Arc::clone(&store));
    (mgr, store)
}

fn assert_consistent(mgr: &Manager, store: &MemoryTokenStore) {
    let access = store.get(TokenSlot::AccessToken).unwrap();
    let refresh = store.get(TokenSlot::RefreshToken).unwrap();
    assert_eq!(
        mgr.is_authenticated(),
        access.is_some(),
        "user {:?} published with access token {access:?}",
        mgr.user()
    );
    assert_eq!(access.is_some(), refresh.is_some());
    assert_eq!(mgr.access_token(), access);
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_logout_during_login_publication_leaves_anonymous_without_tokens() {
    let (mgr, store) = setup();

    interleave(
        &mgr,
        "session established",
        |mgr| async move {
            mgr.login("c@school.edu", "pw").await.unwrap();
        },
        |mgr| async move { mgr.logout().await },
    );

    assert_consistent(&mgr, &store);
    assert!(!mgr.is_authenticated());
    assert_eq!(mgr.access_token(), None);
}

#[test]
fn test_login_during_logout_publication_leaves_authenticated_with_tokens() {
    let (mgr, store) = setup();
    runtime().block_on(async {
        mgr.login("c@school.edu", "pw").await.unwrap();
    });

    interleave(
        &mgr,
        "session cleared",
        |mgr| async move { mgr.logout().await },
        |mgr| async move {
            mgr.login("c@school.edu", "pw").await.unwrap();
        },
    );

    assert_consistent(&mgr, &store);
    assert!(mgr.is_authenticated());
    assert_eq!(mgr.access_token().as_deref(), Some("acc"));
}
