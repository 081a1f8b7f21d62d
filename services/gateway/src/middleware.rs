//! Session gate applied in front of every page
//!
//! Decides whether a request may reach the page it asks for, based on the
//! session cookie and on upstream's opinion of that session. Paths under
//! `/api/` are left alone: those handlers do their own auth.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::{config::GatewayConfig, error::UpstreamError, upstream::Credentials};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::state::AppState;

/// Prefix of the gateway's own endpoints, exempt from the gate
pub const API_PREFIX: &str = "/api/";

/// Paths reachable without a session (prefix match)
pub const PUBLIC_PATHS: [&str; 3] = ["/login", "/signup", "/ingest"];

const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/dashboard";

const CORS_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const CORS_HEADERS: &str = "Content-Type, Authorization, Cookie";

/// Why a session is not trusted; always resolved into a redirect
#[derive(Error, Debug)]
pub enum SessionInvalid {
    #[error("No session token")]
    Missing,

    #[error("Upstream rejected the session: {0}")]
    Rejected(#[from] UpstreamError),
}

/// Outcome of the gate for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard,
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Decision table of the gate
pub fn decide(has_token: bool, is_public: bool, session_valid: bool) -> GateDecision {
    match (has_token, is_public, session_valid) {
        (_, false, false) => GateDecision::RedirectToLogin,
        (true, true, true) => GateDecision::RedirectToDashboard,
        _ => GateDecision::Allow,
    }
}

/// Ask upstream whether the token still designates a user
///
/// Every failure, 401 included, only means "not authenticated".
pub async fn validate_session(
    state: &AppState,
    token: Option<&str>,
) -> Result<Value, SessionInvalid> {
    let token = token.ok_or(SessionInvalid::Missing)?;
    let user = state
        .upstream
        .current_user(Credentials::Bearer(token))
        .await?;
    Ok(user)
}

/// Session gate middleware
pub async fn session_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if path.starts_with(API_PREFIX) {
        return next.run(req).await;
    }

    let is_public = is_public_path(&path);
    let jar = CookieJar::from_headers(req.headers());
    let token = state.cookies.read(&jar);

    // A public page without a token never needs the upstream round-trip
    let session_valid = if token.is_none() && is_public {
        false
    } else {
        match validate_session(&state, token.as_deref()).await {
            Ok(_) => true,
            Err(reason) => {
                debug!("Session not valid for {}: {}", path, reason);
                false
            }
        }
    };

    match decide(token.is_some(), is_public, session_valid) {
        GateDecision::RedirectToLogin => {
            let location = format!(
                "{}?from={}",
                state.config.frontend_path(LOGIN_PATH),
                urlencoding::encode(&path)
            );
            debug!("Redirecting unauthenticated request for {} to login", path);
            Redirect::temporary(&location).into_response()
        }
        GateDecision::RedirectToDashboard => {
            debug!("Redirecting authenticated request for {} to dashboard", path);
            Redirect::temporary(&state.config.frontend_path(DASHBOARD_PATH)).into_response()
        }
        GateDecision::Allow => {
            let has_origin = req.headers().contains_key(header::ORIGIN);
            let mut response = next.run(req).await;
            if has_origin {
                apply_cors(&state.config, response.headers_mut());
            }
            response
        }
    }
}

/// Allow the configured frontend origin, with credentials
fn apply_cors(config: &GatewayConfig, headers: &mut HeaderMap) {
    if let Ok(origin) = HeaderValue::from_str(&config.frontend_url) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_HEADERS),
    );
}
