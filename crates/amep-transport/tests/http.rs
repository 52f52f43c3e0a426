//! Integration tests for the HTTP transport.
//!
//! These tests spin up a tiny canned-response HTTP server on a random
//! port and point a real `HttpAuthApi` at it, so the requests actually go
//! over a socket.

#[cfg(feature = "http")]
mod http {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use amep_protocol::{LoginRequest, NewAccount, RefreshRequest, User};
    use amep_transport::{AuthApi, HttpAuthApi, HttpConfig, TransportError};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One canned route: `(method + path, status, body)`.
    type Route = (&'static str, u16, &'static str);

    /// Raw request text (head + body) as received by the server.
    type Captured = Arc<Mutex<Vec<String>>>;

    /// Starts a server answering each request from `routes` and returns the
    /// base URL plus a log of received requests. Unknown routes get 404.
    async fn start_server(routes: Vec<Route>) -> (String, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::default();

        let log = Arc::clone(&captured);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    let request_line = request.lines().next().unwrap_or_default().to_string();
                    log.lock().unwrap().push(request);

                    let (status, body) = routes
                        .iter()
                        .find(|(route, _, _)| request_line.starts_with(route))
                        .map(|(_, status, body)| (*status, *body))
                        .unwrap_or((404, "not found"));
                    let response = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("http://{addr}/api"), captured)
    }

    /// Reads one HTTP/1.1 request: headers, then `Content-Length` bytes.
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

    fn api(base_url: String) -> HttpAuthApi {
        HttpAuthApi::new(HttpConfig {
            base_url,
            request_timeout: Duration::from_secs(5),
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn test_login_success_returns_user_and_tokens() {
        let (base, captured) = start_server(vec![(
            "POST /api/auth/login",
            200,
            r#"{"user":{"id":1,"name":"A"},"access_token":"acc","refresh_token":"ref"}"#,
        )])
        .await;

        let resp = api(base)
            .login(&LoginRequest::new("a@school.edu", "pw"))
            .await
            .expect("login should succeed");

        assert_eq!(resp.user, User::new(json!({"id": 1, "name": "A"})));
        assert_eq!(resp.access_token, "acc");
        assert_eq!(resp.refresh_token, "ref");

        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains(r#""email":"a@school.edu""#));
        assert!(requests[0].contains(r#""password":"pw""#));
    }

    #[tokio::test]
    async fn test_me_sends_bearer_token() {
        let (base, captured) =
            start_server(vec![("GET /api/auth/me", 200, r#"{"id":7}"#)]).await;

        let user = api(base).me("acc-123").await.expect("should succeed");

        assert_eq!(user, User::new(json!({"id": 7})));
        let requests = captured.lock().unwrap();
        assert!(
            requests[0]
                .to_ascii_lowercase()
                .contains("authorization: bearer acc-123"),
            "missing bearer header: {}",
            requests[0]
        );
    }

    #[tokio::test]
    async fn test_me_unauthorized_returns_unauthorized() {
        let (base, _) =
            start_server(vec![("GET /api/auth/me", 401, r#"{"detail":"expired"}"#)]).await;

        let result = api(base).me("stale").await;

        assert!(matches!(result, Err(TransportError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_register_validation_error_returns_api_error_with_body() {
        let (base, _) = start_server(vec![(
            "POST /api/auth/register",
            422,
            r#"{"detail":"email already registered"}"#,
        )])
        .await;

        let result = api(base)
            .register(&NewAccount::new(json!({"email": "a@school.edu"})))
            .await;

        match result {
            Err(TransportError::Api { status, message }) => {
                assert_eq!(status, 422);
                assert!(message.contains("email already registered"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_malformed_body_returns_decode_error() {
        let (base, _) =
            start_server(vec![("POST /api/auth/refresh", 200, r#"{"token":"x"}"#)]).await;

        let result = api(base)
            .refresh(&RefreshRequest {
                refresh_token: "ref".into(),
            })
            .await;

        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_refresh_success_sends_refresh_token() {
        let (base, captured) = start_server(vec![(
            "POST /api/auth/refresh",
            200,
            r#"{"access_token":"fresh"}"#,
        )])
        .await;

        let resp = api(base)
            .refresh(&RefreshRequest {
                refresh_token: "ref-9".into(),
            })
            .await
            .expect("refresh should succeed");

        assert_eq!(resp.access_token, "fresh");
        assert!(captured.lock().unwrap()[0].contains(r#""refresh_token":"ref-9""#));
    }

    #[tokio::test]
    async fn test_logout_server_error_is_reported() {
        // The session layer ignores this, but the transport must not hide it.
        let (base, _) = start_server(vec![("POST /api/auth/logout", 500, "boom")]).await;

        let result = api(base).logout(Some("acc")).await;

        assert!(matches!(result, Err(TransportError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_returns_unavailable() {
        // Grab a free port, then close it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = api(format!("http://{addr}/api")).me("acc").await;

        assert!(
            matches!(result, Err(TransportError::Unavailable(_))),
            "expected Unavailable, got {result:?}"
        );
    }
}
