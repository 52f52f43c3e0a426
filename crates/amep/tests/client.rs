//! End-to-end tests for `AmepClient`: a real HTTP client against a canned
//! identity API on a random local port.

use std::path::PathBuf;
use std::time::Duration;

use amep::{AmepClient, AmepError};
use amep_dashboard::DashboardError;
use amep_session::{FileTokenStore, TokenSlot, TokenStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const ME_OK: &str = r#"{"id": 7, "name": "Ms. Rivera", "role": "teacher"}"#;
const LOGIN_OK: &str = r#"{
    "user": {"id": 7, "name": "Ms. Rivera", "role": "teacher"},
    "access_token": "acc-1",
    "refresh_token": "ref-1"
}"#;

/// `(method + path, status, body)`.
type Route = (&'static str, u16, &'static str);

async fn start_server(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let request = read_request(&mut stream).await;
                let request_line = request.lines().next().unwrap_or_default().to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(route, _, _)| request_line.starts_with(route))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "{}"));
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/api")
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn temp_token_file() -> PathBuf {
    let nonce: u64 = rand::random();
    std::env::temp_dir()
        .join(format!("amep-client-test-{nonce:x}"))
        .join("tokens.json")
}

#[tokio::test]
async fn test_build_without_tokens_comes_up_anonymous() {
    // Nothing listens here; with no stored token no request is made.
    let client = AmepClient::builder()
        .base_url("http://127.0.0.1:9/api")
        .dashboard_seed(1)
        .build()
        .await
        .expect("build should succeed");

    assert!(!client.session().is_authenticated());
    assert!(!client.session().is_loading());
    assert_eq!(client.dashboard().current().sequence, 1);
    assert_eq!(client.dashboard().interval(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_login_persists_tokens_and_next_client_resumes_session() {
    let base = start_server(vec![
        ("POST /api/auth/login", 200, LOGIN_OK),
        ("GET /api/auth/me", 200, ME_OK),
    ])
    .await;
    let path = temp_token_file();

    let first = AmepClient::builder()
        .base_url(&base)
        .token_file(&path)
        .build()
        .await
        .unwrap();
    assert!(!first.session().is_authenticated());

    let user = first.session().login("rivera@school.edu", "pw").await.unwrap();
    assert_eq!(user.get("name").and_then(|v| v.as_str()), Some("Ms. Rivera"));

    let on_disk = FileTokenStore::new(&path);
    assert_eq!(on_disk.get(TokenSlot::AccessToken).unwrap().as_deref(), Some("acc-1"));
    assert_eq!(on_disk.get(TokenSlot::RefreshToken).unwrap().as_deref(), Some("ref-1"));

    let second = AmepClient::builder()
        .base_url(&base)
        .token_file(&path)
        .build()
        .await
        .unwrap();
    assert!(second.session().is_authenticated());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_build_with_rejected_token_purges_it() {
    let base = start_server(vec![("GET /api/auth/me", 401, r#"{"detail": "expired"}"#)]).await;
    let path = temp_token_file();
    let store = FileTokenStore::new(&path);
    store.set(TokenSlot::AccessToken, "stale").unwrap();
    store.set(TokenSlot::RefreshToken, "stale-ref").unwrap();

    let client = AmepClient::builder()
        .base_url(&base)
        .token_file(&path)
        .build()
        .await
        .expect("a rejected token is not a build error");

    assert!(!client.session().is_authenticated());
    assert_eq!(store.get(TokenSlot::AccessToken).unwrap(), None);
    assert_eq!(store.get(TokenSlot::RefreshToken).unwrap(), None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_shutdown_stops_dashboard() {
    let client = AmepClient::builder()
        .base_url("http://127.0.0.1:9/api")
        .dashboard_interval(Duration::from_secs(5))
        .build()
        .await
        .unwrap();

    client.dashboard().refresh_now().await.unwrap();
    client.shutdown().await.unwrap();

    let err = client
        .dashboard()
        .refresh_now()
        .await
        .map_err(AmepError::from)
        .unwrap_err();
    assert!(matches!(err, AmepError::Dashboard(DashboardError::FeedStopped)));
    assert_eq!(client.dashboard().current().sequence, 2);
}
