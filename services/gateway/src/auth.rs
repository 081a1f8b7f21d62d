//! Login, signup and logout handlers
//!
//! These wrap the upstream auth endpoints and own the session cookie
//! lifecycle. The access token is written to the cookie and never echoed back
//! in a response body.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::error::UpstreamResult;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::{
    error::{GatewayError, GatewayResult},
    models::{LoginRequest, SessionResponse, SignupRequest, TokenResponse, parse_body},
    state::AppState,
};

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Bytes, BytesRejection>,
) -> GatewayResult<Response> {
    let body = body?;
    let payload = parse_body::<LoginRequest>(&body)
        .and_then(LoginRequest::validate)
        .map_err(GatewayError::Validation)?;

    debug!("Login attempt");

    let payload = to_json(&payload)?;
    let result = state.upstream.login(&payload).await;

    establish_session(&state, jar, result, StatusCode::OK)
}

/// User signup endpoint
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Bytes, BytesRejection>,
) -> GatewayResult<Response> {
    let body = body?;
    let payload = parse_body::<SignupRequest>(&body)
        .and_then(SignupRequest::validate)
        .map_err(GatewayError::Validation)?;

    debug!("Signup attempt");

    let payload = to_json(&payload)?;
    let result = state.upstream.signup(&payload).await;

    establish_session(&state, jar, result, StatusCode::CREATED)
}

/// Logout endpoint
///
/// Without a session there is nothing to revoke, so the caller is simply sent
/// to the login page. When upstream refuses the logout the cookie is kept so
/// the client can retry. Any 2xx from upstream counts as success.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> GatewayResult<Response> {
    let Some(token) = state.cookies.read(&jar) else {
        debug!("Logout without session, redirecting to login");
        return Ok(Redirect::temporary(&state.config.frontend_path("/login")).into_response());
    };

    if let Err(e) = state.upstream.logout(&token).await {
        error!("Upstream logout failed (status {:?}): {}", e.status(), e);
        return Err(GatewayError::LogoutFailed);
    }

    let jar = state.cookies.clear(jar);
    let jar = state.cookies.force_refresh(jar);
    info!("Session closed");

    Ok((StatusCode::OK, jar, Json(json!({ "redirect": "/login" }))).into_response())
}

/// Validate the upstream token response and store it in the session cookie
fn establish_session(
    state: &AppState,
    jar: CookieJar,
    result: UpstreamResult<Value>,
    status: StatusCode,
) -> GatewayResult<Response> {
    let token = TokenResponse::from_value(result?).map_err(GatewayError::InvalidTokenResponse)?;

    let jar = state
        .cookies
        .set(jar, &token.access_token, token.expires_at);
    info!("Session established for user {}", token.user_id);

    Ok((status, jar, Json(SessionResponse::from(&token))).into_response())
}

fn to_json<T: serde::Serialize>(payload: &T) -> GatewayResult<Value> {
    serde_json::to_value(payload).map_err(|e| {
        error!("Failed to serialize upstream payload: {}", e);
        GatewayError::InternalServerError
    })
}
