//! Integration tests for the HTTP API.
//!
//! The router runs over in-memory storage, so no database is needed.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use barangay_watch::auth::{AuthResult, ChallengeDelivery, User};
use bw_server::api::{AppState, Repositories, create_router};
use bw_server::config::ServerConfig;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // For `oneshot` method

const PASSWORD: &str = "Barangay2024";

#[derive(Default)]
struct CapturingDelivery {
    last: Mutex<Option<String>>,
}

#[async_trait]
impl ChallengeDelivery for CapturingDelivery {
    async fn deliver(&self, _user: &User, code: &str) -> AuthResult<()> {
        *self.last.lock().unwrap() = Some(code.to_string());
        Ok(())
    }
}

struct TestServer {
    app: Router,
    codes: Arc<CapturingDelivery>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    /// `jwt=<token>` from Set-Cookie, if any
    fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("jwt="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

fn config() -> ServerConfig {
    ServerConfig::from_lookup(None, None, |key| match key {
        "JWT_SECRET" => Some("server-integration-secret-0123456789abcdef".to_string()),
        "PASSWORD_PEPPER" => Some("server-test-pepper".to_string()),
        "COOKIE_SECURE" => Some("false".to_string()),
        _ => None,
    })
    .unwrap()
}

fn create_test_server() -> TestServer {
    let codes = Arc::new(CapturingDelivery::default());
    let state = AppState::new(&config(), Repositories::in_memory(), None, codes.clone());
    TestServer {
        app: create_router(state),
        codes,
    }
}

impl TestServer {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> Reply {
        self.send(Method::POST, uri, Some(body), cookie).await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::GET, uri, None, cookie).await
    }

    async fn login(&self, username: &str) -> String {
        let reply = self
            .post(
                "/auth/login",
                json!({"username": username, "password": PASSWORD}),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.session_cookie().expect("session cookie")
    }

    /// Head-admin "captain" plus official "alice"; returns both cookies
    async fn bootstrap(&self) -> (String, String) {
        let reply = self
            .post(
                "/auth/register",
                json!({"username": "captain", "password": PASSWORD}),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["role"], "head-admin");
        let head = self.login("captain").await;

        let reply = self
            .post(
                "/auth/register",
                json!({"username": "alice", "password": PASSWORD}),
                Some(&head),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["role"], "admin");
        let alice = self.login("alice").await;

        (head, alice)
    }
}

fn report_body(blotter_no: &str) -> Value {
    json!({
        "blotterNo": blotter_no,
        "barangay": "San Isidro",
        "offense": "Theft",
        "dateReported": "2024-03-01",
        "dateCommitted": "2024-02-28",
        "victim": {"name": "Juan Dela Cruz", "age": 30, "gender": "Male", "harmed": "Not Harmed"},
        "suspect": {"status": "At Large"},
        "status": "Unsolved",
        "location": {"lat": 14.6, "lng": 121.0}
    })
}

#[tokio::test]
async fn test_login_rejects_wrong_password_then_sets_cookie() {
    let server = create_test_server();
    server.bootstrap().await;

    let reply = server
        .post(
            "/auth/login",
            json!({"username": "alice", "password": "wrong"}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "INVALID_CREDENTIALS");
    assert!(reply.headers.get(header::SET_COOKIE).is_none());

    let reply = server
        .post(
            "/auth/login",
            json!({"username": "alice", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("jwt="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=1209600"));

    assert_eq!(reply.body["username"], "alice");
    let fields = reply.body.as_object().unwrap();
    assert!(!fields.keys().any(|k| k.to_lowercase().contains("password")));
}

#[tokio::test]
async fn test_unknown_user_gets_same_error_as_wrong_password() {
    let server = create_test_server();
    server.bootstrap().await;

    let reply = server
        .post(
            "/auth/login",
            json!({"username": "nobody", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_two_factor_login_flow() {
    let server = create_test_server();
    let (head, alice) = server.bootstrap().await;

    let me = server.get("/auth/me", Some(&alice)).await;
    let alice_id = me.body["id"].as_i64().unwrap();

    let reply = server
        .post(
            "/admin/changeAdminEnableTwoFa",
            json!({"adminId": alice_id, "currentStatus": false}),
            Some(&head),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["user"]["enableTwoFA"], true);

    let reply = server
        .post(
            "/auth/login",
            json!({"username": "alice", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"step": "2fa", "userId": alice_id}));
    assert!(reply.session_cookie().is_none());

    let code = server.codes.last.lock().unwrap().clone().unwrap();
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let reply = server
        .post(
            "/auth/verify-2fa",
            json!({"userId": alice_id, "code": wrong}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "CHALLENGE_MISMATCH");

    let reply = server
        .post(
            "/auth/verify-2fa",
            json!({"userId": alice_id, "code": code}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["user"]["username"], "alice");
    assert_eq!(reply.body["user"]["role"], "admin");
    let cookie = reply.session_cookie().expect("session cookie");

    let reply = server.get("/auth/me", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["id"], alice_id);

    // Code is single use
    let reply = server
        .post(
            "/auth/verify-2fa",
            json!({"userId": alice_id, "code": code}),
            None,
        )
        .await;
    assert_eq!(reply.error_code(), "CHALLENGE_NOT_FOUND");
}

#[tokio::test]
async fn test_session_required() {
    let server = create_test_server();
    server.bootstrap().await;

    let reply = server.get("/auth/me", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error_code(), "UNAUTHENTICATED");

    let reply = server.get("/auth/me", Some("jwt=not-a-token")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error_code(), "INVALID_TOKEN");

    let reply = server.get("/no/such/route", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let server = create_test_server();
    let reply = server.get("/auth/logout", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("jwt=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_registration_closed_after_bootstrap() {
    let server = create_test_server();
    let (_, alice) = server.bootstrap().await;

    let body = json!({"username": "walkin", "password": PASSWORD});
    let reply = server.post("/auth/register", body.clone(), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = server.post("/auth/register", body, Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_lifecycle_is_audited() {
    let server = create_test_server();
    let (head, alice) = server.bootstrap().await;

    let reply = server
        .post("/report/create", report_body("BLT-001"), Some(&alice))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let report = reply.body.clone();
    let id = report["id"].as_i64().unwrap();

    let reply = server
        .post("/report/create", report_body("BLT-001"), Some(&alice))
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.error_code(), "DUPLICATE_BLOTTER");

    let mut edited = report.clone();
    edited["victim"]["age"] = json!(31);
    let reply = server
        .post(
            "/report/changeStatus",
            json!({"oldReportData": report, "selectedReport": edited}),
            Some(&alice),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["victim"]["age"], 31);

    let reply = server
        .get(&format!("/report/{id}/history"), Some(&head))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let entries = reply.body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "Created Report");
    assert_eq!(entries[1]["action"], "Updated Report");
    assert_eq!(entries[1]["changeCount"], 1);
    assert_eq!(entries[1]["changes"][0]["field"], "victim.age");
    assert_eq!(entries[1]["changes"][0]["oldValue"], "30");
    assert_eq!(entries[1]["changes"][0]["newValue"], "31");

    // Officials cannot read the audit trail
    let reply = server.get("/audit/logs", Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server.get("/audit/logs?limit=1", Some(&head)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert_eq!(reply.body[0]["action"], "Updated Report");
}

#[tokio::test]
async fn test_report_validation_and_permissions() {
    let server = create_test_server();
    let (head, alice) = server.bootstrap().await;

    let reply = server
        .post("/report/create", report_body("BLT-900"), Some(&head))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let mut body = report_body("BLT-901");
    body["status"] = json!("Closed");
    let reply = server.post("/report/create", body, Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "VALIDATION_ERROR");

    let mut body = report_body("BLT-902");
    body["victim"]["age"] = json!(200);
    let reply = server.post("/report/create", body, Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(
        reply.body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("victim.age")
    );

    let reply = server.get("/report/4242", Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = server
        .post("/report/create", report_body("BLT-903"), Some(&alice))
        .await;
    let id = reply.body["id"].as_i64().unwrap();

    let reply = server.get("/report/list", Some(&head)).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);

    let reply = server
        .post("/report/delete", json!({"id": id}), Some(&alice))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["blotterNo"], "BLT-903");

    let reply = server.get("/report/list", Some(&alice)).await;
    assert!(reply.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_endpoints() {
    let server = create_test_server();
    let (head, alice) = server.bootstrap().await;

    let reply = server.get("/admin/getAllAdmin", Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server.get("/admin/getAllAdmin", Some(&head)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let users = reply.body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(!reply.body.to_string().contains("passwordHash"));

    let head_id = users
        .iter()
        .find(|u| u["role"] == "head-admin")
        .unwrap()["id"]
        .clone();
    let alice_id = users.iter().find(|u| u["role"] == "admin").unwrap()["id"].clone();

    // Alice may opt in, but only the head-admin can switch it back off
    let reply = server
        .post(
            "/admin/changeAdminEnableTwoFa",
            json!({"adminId": alice_id, "currentStatus": false}),
            Some(&alice),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["enableTwoFA"], true);

    let reply = server
        .post(
            "/admin/changeAdminEnableTwoFa",
            json!({"adminId": alice_id, "currentStatus": true}),
            Some(&alice),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server
        .post(
            "/admin/changeAdminEnableTwoFa",
            json!({"adminId": alice_id, "currentStatus": true}),
            Some(&head),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["enableTwoFA"], false);

    let reply = server
        .post("/admin/deleteAdmin", json!({"id": head_id}), Some(&head))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server
        .post("/admin/deleteAdmin", json!({"id": alice_id}), Some(&alice))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server
        .post("/admin/deleteAdmin", json!({"id": alice_id}), Some(&head))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["username"], "alice");

    // Cookie of the deleted account no longer resolves
    let reply = server.get("/auth/me", Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tips_are_public_to_submit() {
    let server = create_test_server();
    let (_, alice) = server.bootstrap().await;

    let reply = server
        .post(
            "/tips",
            json!({"barangay": "Poblacion", "description": "Loud fight near the market"}),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = server
        .post("/tips", json!({"barangay": "Poblacion", "description": " "}), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = server.get("/tips", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = server.get("/tips", Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ai_setting_is_head_admin_only() {
    let server = create_test_server();
    let (head, alice) = server.bootstrap().await;

    let reply = server.get("/settings/ai", Some(&alice)).await;
    assert_eq!(reply.body, json!({"enabled": false}));

    let reply = server
        .post("/settings/ai", json!({"enabled": true}), Some(&alice))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = server
        .post("/settings/ai", json!({"enabled": true}), Some(&head))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"enabled": true}));
}

#[tokio::test]
async fn test_health_and_request_id() {
    let server = create_test_server();

    let reply = server.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.body["database"], "in-memory");
    assert!(reply.headers.contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let server = create_test_server();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
