//! Reverse proxy to the upstream backend
//!
//! `ANY /api/proxy/<path>` is forwarded to `BACKEND_URL/<path>`. The gateway
//! is the only credential authority for browser calls: when a session cookie
//! is present its token replaces any caller-supplied `Authorization` header.
//! Without a cookie, a caller's bearer header is passed through untouched so
//! server-to-server calls keep working. The two are never combined.

use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    error::{GatewayError, GatewayResult},
    state::AppState,
};

/// Prefix stripped from proxied paths
pub const PROXY_PREFIX: &str = "/api/proxy";

/// Upstream path for an incoming proxy path
///
/// Upstream rejects trailing slashes, so exactly one is removed.
pub fn upstream_path(path: &str) -> &str {
    let path = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Headers sent upstream for a proxied call
pub fn outbound_headers(incoming: &HeaderMap, session_token: Option<&str>) -> GatewayResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    let content_type = incoming
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    headers.insert(header::CONTENT_TYPE, content_type);

    if let Some(token) = session_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| GatewayError::Proxy(format!("session token is not a valid header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, value);
    } else if let Some(value) = incoming.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, value.clone());
    }

    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(headers)
}

/// Proxy handler
pub async fn proxy(State(state): State<AppState>, jar: CookieJar, req: Request<Body>) -> Response {
    match forward(&state, &jar, req).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn forward(state: &AppState, jar: &CookieJar, req: Request<Body>) -> GatewayResult<Response> {
    let (parts, body) = req.into_parts();

    let mut target = upstream_path(parts.uri.path()).to_string();
    if let Some(query) = parts.uri.query() {
        target.push('?');
        target.push_str(query);
    }

    let session_token = state.cookies.read(jar);
    let headers = outbound_headers(&parts.headers, session_token.as_deref())?;

    let body = if parts.method == Method::GET || parts.method == Method::HEAD {
        None
    } else {
        let bytes = axum::body::to_bytes(body, state.config.max_body_bytes)
            .await
            .map_err(|e| GatewayError::Proxy(format!("failed to read request body: {}", e)))?;
        Some(bytes)
    };

    debug!("Proxying {} {}", parts.method, target);

    let response = state
        .upstream
        .forward(parts.method, &target, headers, body)
        .await
        .map_err(|e| GatewayError::Proxy(e.to_string()))?;

    relay(response).await
}

/// Rebuild the upstream response for the caller
///
/// Only the status, the JSON body and `Set-Cookie` headers survive.
async fn relay(response: reqwest::Response) -> GatewayResult<Response> {
    let status = response.status();
    let set_cookies: Vec<HeaderValue> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();

    let bytes: Bytes = response
        .bytes()
        .await
        .map_err(|e| GatewayError::Proxy(format!("failed to read upstream body: {}", e)))?;

    let mut relayed = if bytes.iter().all(u8::is_ascii_whitespace) {
        status.into_response()
    } else {
        let data: Value = serde_json::from_slice(&bytes).map_err(|e| {
            error!("Upstream returned a non-JSON body with status {}", status);
            GatewayError::Proxy(format!("upstream body is not JSON: {}", e))
        })?;
        (status, Json(data)).into_response()
    };

    for cookie in set_cookies {
        relayed.headers_mut().append(header::SET_COOKIE, cookie);
    }

    Ok(relayed)
}
