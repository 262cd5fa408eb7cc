//! End-to-end client behaviour against a local mock backend.
//!
//! The mock speaks just enough HTTP/1.1 to serve canned JSON and record
//! every request (method, path, bearer header, body), which lets these
//! tests assert not only on results but on which requests were or were
//! not sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use cineclub_api::movies::{UserAction, WatchToggle};
use cineclub_api::users::ImageKind;
use cineclub_api::{ApiClient, ApiError, ChatPoller, Pager};
use cineclub_core::{ClientSettings, Session, SessionStore};

// ── Mock backend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Handler = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

struct MockServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    async fn start(handler: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let recorded = recorded.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    serve_one(stream, recorded, handler).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_one(mut stream: TcpStream, recorded: Arc<Mutex<Vec<Recorded>>>, handler: Arc<Handler>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let Ok(n) = stream.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let Ok(n) = stream.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

    let request = Recorded {
        method,
        path,
        authorization,
        body,
    };
    let (status, response_body) = handler(&request);
    recorded.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{response_body}",
        response_body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_token(expires_in_secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = Utc::now().timestamp() + expires_in_secs;
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}

fn client_for(server: &MockServer, dir: &tempfile::TempDir) -> (ApiClient, SessionStore) {
    let settings = ClientSettings {
        api_base_url: format!("{}/api", server.base_url()),
        responder_base_url: server.base_url(),
        poll_interval_secs: 5,
    };
    let store = SessionStore::at(dir.path().join("session.json")).unwrap();
    let client = ApiClient::new(settings, store.clone()).unwrap();
    (client, store)
}

fn logged_in(store: &SessionStore, access: String) {
    store
        .set(Session {
            access,
            refresh: "refresh-1".into(),
            username: Some("alice".into()),
        })
        .unwrap();
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_both_tokens_and_sends_bearer_afterwards() {
    let access = make_token(3600);
    let access_for_handler = access.clone();
    let server = MockServer::start(move |req| match req.path.as_str() {
        "/api/users/login/" => (
            200,
            format!(r#"{{"access":"{access_for_handler}","refresh":"refresh-1"}}"#),
        ),
        "/api/users/me/" => (
            200,
            format!(r#"{{"id":"{}","username":"alice"}}"#, Uuid::nil()),
        ),
        other => panic!("unexpected path {other}"),
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);

    client.login("alice@example.com", "hunter22").await.unwrap();

    let session = store.current().unwrap();
    assert_eq!(session.access, access);
    assert_eq!(session.refresh, "refresh-1");
    assert_eq!(session.username.as_deref(), Some("alice"));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/users/login/");
    assert!(requests[0].authorization.is_none());
    assert_eq!(
        requests[1].authorization.as_deref(),
        Some(format!("Bearer {access}").as_str())
    );
}

#[tokio::test]
async fn expired_access_is_refreshed_before_the_dependent_request() {
    let fresh = make_token(3600);
    let fresh_for_handler = fresh.clone();
    let server = MockServer::start(move |req| match req.path.as_str() {
        "/api/token/refresh/" => (200, format!(r#"{{"access":"{fresh_for_handler}"}}"#)),
        path if path.starts_with("/api/movies/") => {
            (200, r#"{"count":0,"next":null,"results":[]}"#.into())
        }
        other => panic!("unexpected path {other}"),
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(-60));

    client.movies(1).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/token/refresh/");
    assert!(requests[0].body.contains("refresh-1"));
    assert_eq!(
        requests[1].authorization.as_deref(),
        Some(format!("Bearer {fresh}").as_str())
    );

    // The rotated token is persisted, not just used once.
    assert_eq!(store.access_token().as_deref(), Some(fresh.as_str()));
    let reopened = SessionStore::at(dir.path().join("session.json")).unwrap();
    assert_eq!(reopened.access_token().as_deref(), Some(fresh.as_str()));
    assert_eq!(reopened.current().unwrap().refresh, "refresh-1");
}

#[tokio::test]
async fn failed_refresh_drops_the_session() {
    let server = MockServer::start(|req| match req.path.as_str() {
        "/api/token/refresh/" => (401, r#"{"detail":"token not valid"}"#.into()),
        other => panic!("unexpected path {other}"),
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(-60));

    let err = client.movies(1).await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
    assert!(!store.is_logged_in());
    // Only the refresh attempt went out; the movies request never did.
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn any_401_drops_the_session() {
    let server =
        MockServer::start(|_req| (401, r#"{"detail":"invalid token"}"#.into())).await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ApiError::AuthRequired));
    assert!(!store.is_logged_in());
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn operations_without_a_session_fail_before_any_request() {
    let server = MockServer::start(|_req| (200, "{}".into())).await;
    let dir = tempfile::tempdir().unwrap();
    let (client, _store) = client_for(&server, &dir);

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, ApiError::NotLoggedIn));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn pagination_stops_exactly_at_null_next() {
    let movie = |title: &str| {
        format!(
            r#"{{"id":"{}","titulo":"{title}"}}"#,
            Uuid::new_v4()
        )
    };
    let page_one = format!(
        r#"{{"count":3,"next":"/api/movies/?page=2","results":[{},{}]}}"#,
        movie("First"),
        movie("Second")
    );
    let page_two = format!(r#"{{"count":3,"next":null,"results":[{}]}}"#, movie("Third"));
    let server = MockServer::start(move |req| match req.path.as_str() {
        "/api/movies/?page=1" => (200, page_one.clone()),
        "/api/movies/?page=2" => (200, page_two.clone()),
        other => panic!("unexpected path {other}"),
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let mut pager = Pager::new();
    while pager.has_more() {
        let page = client.movies(pager.next_page()).await.unwrap();
        pager.absorb(page);
    }

    assert_eq!(pager.items.len(), 3);
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn liking_an_already_liked_movie_sends_null() {
    let server = MockServer::start(|req| {
        assert!(req.path.ends_with("/update_action/"));
        (200, r#"{"like":null,"assistido":true}"#.into())
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let current = UserAction {
        like: Some(1),
        watched: true,
        ..Default::default()
    };
    let updated = client
        .toggle_action(Uuid::new_v4(), WatchToggle::Like, &current)
        .await
        .unwrap();

    assert_eq!(updated.like, None);
    let sent: serde_json::Value = serde_json::from_str(&server.requests()[0].body).unwrap();
    assert_eq!(sent, serde_json::json!({ "like": null }));
}

#[tokio::test]
async fn commenting_and_rating_require_watched_without_a_request() {
    let server = MockServer::start(|_req| (200, "{}".into())).await;
    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let unwatched = UserAction::default();
    let movie_id = Uuid::new_v4();

    let err = client
        .post_comment(movie_id, "great movie", None, &unwatched)
        .await
        .unwrap_err();
    assert_eq!(err.field_errors()[0].field, "texto");

    let err = client.rate(movie_id, 8.0, &unwatched).await.unwrap_err();
    assert_eq!(err.field_errors()[0].field, "nota");

    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn comment_summary_returns_the_digest_text() {
    let server = MockServer::start(|req| {
        assert!(req.path.ends_with("/summarize-comments/"));
        (200, r#"{"resumo":"Todos gostaram do final."}"#.into())
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let summary = client.summarize_comments(Uuid::new_v4()).await.unwrap();
    assert_eq!(summary, "Todos gostaram do final.");
    assert!(server.requests()[0].authorization.is_some());
}

#[tokio::test]
async fn image_uploads_send_multipart_and_reject_unknown_formats() {
    let owner = Uuid::nil();
    let server = MockServer::start(move |req| {
        if req.path.ends_with("/upload-image/") {
            (
                200,
                format!(r#"{{"id":"{owner}","username":"alice"}}"#),
            )
        } else {
            (
                200,
                format!(r#"{{"id":7,"name":"club","description":"","owner":"{owner}"}}"#),
            )
        }
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let image = dir.path().join("pic.png");
    std::fs::write(&image, b"png-bytes").unwrap();

    let user = client
        .upload_image("alice", ImageKind::Avatar, &image)
        .await
        .unwrap();
    assert_eq!(user.username, "alice");

    let sent = &server.requests()[0];
    assert!(sent.path.ends_with("/users/alice/upload-image/"));
    assert!(sent.body.contains("name=\"type\""));
    assert!(sent.body.contains("avatar"));
    assert!(sent.body.contains("filename=\"pic.png\""));
    assert!(sent.body.contains("image/png"));
    assert!(sent.body.contains("png-bytes"));

    client.upload_icon(7, &image).await.unwrap();
    let sent = &server.requests()[1];
    assert!(sent.path.ends_with("/communities/7/upload-icon/"));
    assert!(sent.body.contains("name=\"icon\""));

    // Anything that is not JPG or PNG never leaves the client.
    let gif = dir.path().join("pic.gif");
    std::fs::write(&gif, b"gif-bytes").unwrap();
    let err = client.upload_icon(7, &gif).await.unwrap_err();
    assert_eq!(err.field_errors()[0].field, "image");
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn login_validation_errors_map_to_fields_and_toast() {
    let server = MockServer::start(|_req| {
        (
            400,
            r#"{"email":["enter a valid email"],"non_field_errors":["invalid credentials"]}"#
                .into(),
        )
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);

    let err = client.login("nope", "pw").await.unwrap_err();
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(err.field_errors()[0].field, "email");
    assert_eq!(err.toast(), "invalid credentials");
    assert!(!store.is_logged_in());
}

#[tokio::test]
async fn chat_poller_polls_until_stopped_and_then_goes_quiet() {
    let server = MockServer::start(|req| {
        assert!(req.path.ends_with("/messages/"));
        (
            200,
            r#"[{"username":"bob","content":"hi","sent_at":"2026-05-01T10:00:00Z"}]"#.into(),
        )
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, store) = client_for(&server, &dir);
    logged_in(&store, make_token(3600));

    let poller = ChatPoller::spawn(client, 1, 2, Duration::from_millis(25));
    let mut rx = poller.subscribe();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update()[0].content, "hi");

    // Let a few more polls happen, then stop.
    tokio::time::sleep(Duration::from_millis(80)).await;
    poller.stop();
    // Drain any request that was in flight when the poller stopped.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_stop = server.request_count();
    assert!(after_stop >= 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.request_count(), after_stop);
}
