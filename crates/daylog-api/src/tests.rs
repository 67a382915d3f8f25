use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use daylog_db::Database;

use super::*;
use crate::clock::ManualClock;
use crate::middleware::BOT_API_KEY_HEADER;

const JWT_SECRET: &str = "test-secret";
const BOT_KEY: &str = "bot-key";

struct Harness {
    state: AppState,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        Self::with_bot_key(Some(BOT_KEY))
    }

    fn with_bot_key(bot_api_key: Option<&str>) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().expect("open db"),
            jwt_secret: JWT_SECRET.to_string(),
            bot_api_key: bot_api_key.map(str::to_string),
            telegram_bot_name: Some("daylog_bot".to_string()),
            clock: clock.clone(),
        });
        Self { state, clock }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Inserts a user directly and returns its id plus a session token.
    fn user(&self, email: &str) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.state
            .db
            .create_user(&id.to_string(), "Test", email, "unused-hash")
            .expect("create user");
        let token = auth::create_token(JWT_SECRET, id, email).expect("session token");
        (id, token)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn web(method: &str, uri: &str, session: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {session}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

fn bot(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(BOT_API_KEY_HEADER, BOT_KEY);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn issue(h: &Harness, session: &str) -> String {
    let (status, body) = h
        .send(web("POST", "/api/user/generate-telegram-token", session, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn register_then_login_issues_working_sessions() {
    let h = Harness::new();

    let (status, registered) = h
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"name": "Ada", "email": " Ada@Example.com ", "password": "correct horse"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let session = registered["token"].as_str().unwrap().to_string();

    let (status, me) = h.send(web("GET", "/api/user/me", &session, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "ada@example.com");
    assert_eq!(me["user"]["timezone"], "UTC");
    assert!(me["user"]["channel_id"].is_null());

    let login = |password: &str| {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"email": "ada@example.com", "password": password}).to_string(),
            ))
            .unwrap()
    };
    let (status, _) = h.send(login("wrong password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = h.send(login("correct horse")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    let (status, _) = h
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"name": "Imposter", "email": "ada@example.com", "password": "12345678"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn web_routes_require_a_session() {
    let h = Harness::new();
    let (status, body) = h
        .send(Request::builder().uri("/api/user/me").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = h.send(web("GET", "/api/entries", "not-a-jwt", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bot_routes_require_the_shared_key() {
    let h = Harness::new();
    let (status, _) = h
        .send(
            Request::builder()
                .uri("/api/bot/user/42")
                .header(BOT_API_KEY_HEADER, "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unconfigured = Harness::with_bot_key(None);
    let (status, body) = unconfigured.send(bot("GET", "/api/bot/user/42", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server configuration error");
}

#[tokio::test]
async fn generated_token_comes_with_deep_link_and_ten_minute_window() {
    let h = Harness::new();
    let (_, session) = h.user("ada@example.com");

    let (status, body) = h
        .send(web("POST", "/api/user/generate-telegram-token", &session, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(
        body["deep_link"],
        format!("https://t.me/daylog_bot?start={token}")
    );
    let expires_at: DateTime<Utc> = serde_json::from_value(body["expires_at"].clone()).unwrap();
    assert_eq!(expires_at, t0() + Duration::minutes(10));
}

#[tokio::test]
async fn link_then_message_creates_entry_for_linked_user() {
    let h = Harness::new();
    let (user_id, session) = h.user("ada@example.com");
    let token = issue(&h, &session).await;

    h.clock.advance(Duration::minutes(5));
    let (status, body) = h
        .send(bot(
            "POST",
            "/api/bot/link-telegram",
            Some(json!({"token": token, "channel_id": "C1", "channel_username": "ada"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.to_string());

    let (_, me) = h.send(web("GET", "/api/user/me", &session, None)).await;
    assert_eq!(me["user"]["channel_id"], "C1");
    assert_eq!(me["user"]["channel_username"], "ada");

    h.clock.advance(Duration::seconds(1));
    let (status, body) = h.send(bot("GET", "/api/bot/user/C1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.to_string());

    let before = Utc::now() - Duration::seconds(1);
    let (status, body) = h
        .send(bot(
            "POST",
            "/api/bot/entries",
            Some(json!({"user_id": user_id, "content": "hello"})),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entry"]["content"], "hello");
    assert_eq!(body["entry"]["user_id"], user_id.to_string());
    let stamped: DateTime<Utc> = serde_json::from_value(body["entry"]["timestamp"].clone()).unwrap();
    assert!(stamped >= before);

    // Same token a second time
    let (status, _) = h
        .send(bot(
            "POST",
            "/api/bot/link-telegram",
            Some(json!({"token": token, "channel_id": "C1"})),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_token_is_rejected_and_leaves_identity_unbound() {
    let h = Harness::new();
    let (_, session) = h.user("ada@example.com");
    let token = issue(&h, &session).await;

    h.clock.advance(Duration::minutes(11));
    let link = || {
        bot(
            "POST",
            "/api/bot/link-telegram",
            Some(json!({"token": token, "channel_id": "C1"})),
        )
    };
    let (status, body) = h.send(link()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token has expired");

    let (status, _) = h.send(link()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.send(bot("GET", "/api/bot/user/C1", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn link_request_validates_fields() {
    let h = Harness::new();
    let (status, body) = h
        .send(bot(
            "POST",
            "/api/bot/link-telegram",
            Some(json!({"token": "  ", "channel_id": "C1"})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = h
        .send(bot(
            "POST",
            "/api/bot/link-telegram",
            Some(json!({"channel_id": "C1"})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bot_entry_keeps_message_time_and_rejects_blank_content() {
    let h = Harness::new();
    let (user_id, _) = h.user("ada@example.com");
    let sent = "2025-02-28T12:00:00Z";

    let (status, body) = h
        .send(bot(
            "POST",
            "/api/bot/entries",
            Some(json!({"user_id": user_id, "content": "yesterday's note", "timestamp": sent})),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let stamped: DateTime<Utc> = serde_json::from_value(body["entry"]["timestamp"].clone()).unwrap();
    assert_eq!(stamped, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());

    let (status, body) = h
        .send(bot(
            "POST",
            "/api/bot/entries",
            Some(json!({"user_id": user_id, "content": "   "})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content is required");

    let (status, _) = h
        .send(bot(
            "POST",
            "/api/bot/entries",
            Some(json!({"user_id": Uuid::new_v4(), "content": "orphan"})),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entries_are_browsable_by_range_and_owner_scoped() {
    let h = Harness::new();
    let (_, ada) = h.user("ada@example.com");
    let (_, bob) = h.user("bob@example.com");

    for (content, timestamp) in [
        ("monday", "2025-03-03T08:00:00Z"),
        ("tuesday", "2025-03-04T08:00:00Z"),
        ("wednesday", "2025-03-05T08:00:00Z"),
    ] {
        let (status, _) = h
            .send(web(
                "POST",
                "/api/entries",
                &ada,
                Some(json!({"content": content, "timestamp": timestamp})),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = h
        .send(web(
            "GET",
            "/api/entries?start=2025-03-03T08:00:00Z&end=2025-03-04T08:00:00Z",
            &ada,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["tuesday", "monday"]);

    let (status, _) = h
        .send(web(
            "GET",
            "/api/entries?start=2025-03-05T00:00:00Z&end=2025-03-01T00:00:00Z",
            &ada,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = h.send(web("GET", "/api/entries", &ada, None)).await;
    let newest = body["entries"][0].clone();
    assert_eq!(newest["content"], "wednesday");
    let id = newest["id"].as_str().unwrap().to_string();

    let (_, body) = h.send(web("GET", "/api/entries", &bob, None)).await;
    assert!(body["entries"].as_array().unwrap().is_empty());

    let uri = format!("/api/entries/{id}");
    let (status, _) = h
        .send(web("PATCH", &uri, &bob, Some(json!({"content": "hijacked"}))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.send(web("DELETE", &uri, &bob, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .send(web("PATCH", &uri, &ada, Some(json!({"content": " "}))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .send(web("PATCH", &uri, &ada, Some(json!({"content": "hump day"}))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["content"], "hump day");
    assert_eq!(body["entry"]["timestamp"], newest["timestamp"]);

    let (status, body) = h.send(web("DELETE", &uri, &ada, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = h.send(web("GET", "/api/entries", &ada, None)).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_query_and_path_get_json_errors() {
    let h = Harness::new();
    let (_, ada) = h.user("ada@example.com");

    // An unescaped `+` in the offset decodes to a space.
    for uri in [
        "/api/entries?start=garbage&end=2025-03-04T08:00:00Z",
        "/api/entries?start=2025-03-03T08:00:00+02:00&end=2025-03-04T08:00:00Z",
    ] {
        let (status, body) = h.send(web("GET", uri, &ada, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }

    let (status, body) = h
        .send(web(
            "PATCH",
            "/api/entries/not-a-uuid",
            &ada,
            Some(json!({"content": "edit"})),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Entry not found");

    let (status, body) = h
        .send(web("DELETE", "/api/entries/not-a-uuid", &ada, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Entry not found");
}

#[tokio::test]
async fn timezone_can_be_changed() {
    let h = Harness::new();
    let (_, session) = h.user("ada@example.com");

    let (status, body) = h
        .send(web(
            "PATCH",
            "/api/user/timezone",
            &session,
            Some(json!({"timezone": "Europe/Berlin"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["timezone"], "Europe/Berlin");

    let (status, _) = h
        .send(web(
            "PATCH",
            "/api/user/timezone",
            &session,
            Some(json!({"timezone": ""})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_public() {
    let h = Harness::new();
    let (status, body) = h
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
