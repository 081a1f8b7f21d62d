//! Mock upstream backend and gateway harness shared by the integration tests

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration as ChronoDuration, Utc};
use common::config::{AppEnv, GatewayConfig};
use gateway::{routes::create_router, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const FRONTEND_URL: &str = "http://localhost:3000";

/// Token upstream accepts on `/users/me`
pub const VALID_TOKEN: &str = "valid-token";
/// Token upstream refuses to log out
pub const FAILING_LOGOUT_TOKEN: &str = "logout-fails";
/// Token whose logout upstream acknowledges with a plain-text body
pub const PLAIN_LOGOUT_TOKEN: &str = "logout-plain";
/// Token issued by the mock on login and signup
pub const ISSUED_TOKEN: &str = "issued-token-4f9a2c";
pub const USER_ID: &str = "6f1c1d1e-8f3a-4b5e-9a7b-2c3d4e5f6a7b";

/// A request as seen by the mock upstream
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct MockUpstream {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockUpstream {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("mock lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn token_body(expires_at: String) -> Value {
    json!({
        "access_token": ISSUED_TOKEN,
        "token_type": "bearer",
        "expires_at": expires_at,
        "user_id": USER_ID,
    })
}

async fn record(
    State(mock): State<MockUpstream>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.requests.lock().expect("mock lock").push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_str(&headers, header::AUTHORIZATION),
        content_type: header_str(&headers, header::CONTENT_TYPE),
        cache_control: header_str(&headers, header::CACHE_CONTROL),
        body: body.clone(),
    });

    let body_json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let authorization = header_str(&headers, header::AUTHORIZATION);

    match uri.path() {
        "/api/v1/auth/login" => login(&body_json),
        "/api/v1/auth/signup" => signup(&body_json),
        "/api/v1/auth/logout" => {
            if authorization.as_deref() == Some(bearer(FAILING_LOGOUT_TOKEN).as_str()) {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "boom" })),
                )
                    .into_response()
            } else if authorization.as_deref() == Some(bearer(PLAIN_LOGOUT_TOKEN).as_str()) {
                ([(header::CONTENT_TYPE, "text/plain")], "Logged out").into_response()
            } else {
                Json(json!({ "message": "Logged out" })).into_response()
            }
        }
        "/api/v1/users/me" => {
            if authorization.as_deref() == Some(bearer(VALID_TOKEN).as_str()) {
                Json(json!({ "id": USER_ID, "email": "jane@example.com" })).into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "detail": "Not authenticated" })),
                )
                    .into_response()
            }
        }
        "/v1/empty" => StatusCode::NO_CONTENT.into_response(),
        "/v1/slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "late": true })).into_response()
        }
        "/v1/html" => (
            [(header::CONTENT_TYPE, "text/html")],
            "<p>maintenance</p>",
        )
            .into_response(),
        "/v1/missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Not found" })),
        )
            .into_response(),
        path => (
            StatusCode::OK,
            [
                (header::SET_COOKIE, "upstream_session=abc; Path=/"),
                (header::HeaderName::from_static("x-upstream-secret"), "leak"),
            ],
            Json(json!({
                "method": method.as_str(),
                "path": path,
                "authorization": authorization,
                "echo": body_json,
            })),
        )
            .into_response(),
    }
}

/// An expiry one hour in the past, formatted without offset
fn past_expiry() -> String {
    (Utc::now() - ChronoDuration::hours(1))
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn login(body: &Value) -> Response {
    let now = Utc::now();
    match body["email"].as_str() {
        Some("wrong@example.com") => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
            .into_response(),
        Some("expired@example.com") => Json(token_body(past_expiry())).into_response(),
        Some("garbage@example.com") => "<html>bad gateway</html>".into_response(),
        Some("malformed@example.com") => {
            Json(json!({ "access_token": ISSUED_TOKEN })).into_response()
        }
        _ => Json(token_body((now + ChronoDuration::hours(1)).to_rfc3339())).into_response(),
    }
}

fn signup(body: &Value) -> Response {
    match body["email"].as_str() {
        Some("taken@example.com") => (
            StatusCode::CONFLICT,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response(),
        Some("expired@example.com") => {
            (StatusCode::CREATED, Json(token_body(past_expiry()))).into_response()
        }
        _ => (
            StatusCode::CREATED,
            Json(token_body(
                (Utc::now() + ChronoDuration::hours(2)).to_rfc3339(),
            )),
        )
            .into_response(),
    }
}

/// Start the mock upstream on an ephemeral port
pub async fn spawn_upstream() -> (MockUpstream, String) {
    let mock = MockUpstream::default();
    let router = Router::new().fallback(record).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("mock upstream address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (mock, format!("http://{}", addr))
}

pub fn test_config(backend_url: String) -> GatewayConfig {
    GatewayConfig {
        backend_url,
        upstream_api_prefix: "/api/v1".to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        app_env: AppEnv::Development,
        bind_addr: "127.0.0.1:0".to_string(),
        upstream_timeout: Duration::from_secs(5),
        max_body_bytes: 1024 * 1024,
        pages_dir: "public".to_string(),
    }
}

/// Stand-in for the page renderer
pub fn test_pages() -> Router {
    Router::new()
        .route("/", get(|| async { "home" }))
        .route("/dashboard", get(|| async { "dashboard" }))
        .route("/facilities/:id/contact", get(|| async { "contact form" }))
        .route("/login", get(|| async { "login page" }))
        .route("/signup", get(|| async { "signup page" }))
        .route("/ingest/e", post(|| async { StatusCode::OK }))
}

pub struct Harness {
    pub app: Router,
    pub upstream: MockUpstream,
}

impl Harness {
    pub async fn new() -> Self {
        let (upstream, base_url) = spawn_upstream().await;
        Self::with_backend(upstream, base_url)
    }

    pub fn with_backend(upstream: MockUpstream, backend_url: String) -> Self {
        Self::with_config(upstream, test_config(backend_url))
    }

    /// Harness against a running mock with a tweaked configuration
    pub async fn configured(tweak: impl FnOnce(&mut GatewayConfig)) -> Self {
        let (upstream, base_url) = spawn_upstream().await;
        let mut config = test_config(base_url);
        tweak(&mut config);
        Self::with_config(upstream, config)
    }

    pub fn with_config(upstream: MockUpstream, config: GatewayConfig) -> Self {
        let state = AppState::new(config).expect("gateway state");
        Harness {
            app: create_router(state, test_pages()),
            upstream,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.expect("infallible router")
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_with_cookie(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("auth_token={}", token));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    String::from_utf8(bytes.to_vec()).expect("UTF-8 body")
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ASCII cookie").to_string())
        .collect()
}

pub fn cookie_named<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
}

/// `Max-Age` attribute of a `Set-Cookie` value
pub fn max_age(cookie: &str) -> Option<i64> {
    cookie
        .split(';')
        .map(str::trim)
        .find_map(|attr| attr.strip_prefix("Max-Age="))
        .and_then(|v| v.parse().ok())
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
