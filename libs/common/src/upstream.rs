//! HTTP client for the upstream backend
//!
//! Every call funnels through [`normalize_response`], so callers see a single
//! error taxonomy whether they authenticate with a bearer token or by
//! forwarding the browser's cookies.

use std::collections::HashMap;

use reqwest::{
    Method, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    config::GatewayConfig,
    error::{UpstreamError, UpstreamResult},
};

const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

/// How an upstream call authenticates
#[derive(Debug, Clone, Copy)]
pub enum Credentials<'a> {
    /// No credentials at all
    Anonymous,
    /// `Authorization: Bearer <token>`, for callers holding the session cookie value
    Bearer(&'a str),
    /// Raw `Cookie` header forwarded as-is, for callers relying on ambient cookies
    Cookie(&'a str),
}

/// Upstream backend client
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    backend_url: String,
    api_base: String,
}

impl UpstreamClient {
    /// Create a client with the configured timeout
    pub fn new(config: &GatewayConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(UpstreamError::Transport)?;

        Ok(UpstreamClient {
            http,
            backend_url: config.backend_url.clone(),
            api_base: format!("{}{}", config.backend_url, config.upstream_api_prefix),
        })
    }

    /// Absolute URL of an endpoint of the upstream API
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    /// Call a JSON endpoint of the upstream API
    ///
    /// An empty successful body yields `Value::Null`.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        credentials: Credentials<'_>,
    ) -> UpstreamResult<Value> {
        let url = self.api_url(endpoint);
        debug!("Upstream call {} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");

        request = match credentials {
            Credentials::Anonymous => request,
            Credentials::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Credentials::Cookie(cookies) => request.header(COOKIE, cookies),
        };

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        normalize_response(response).await
    }

    /// `POST /auth/login`
    pub async fn login(&self, payload: &Value) -> UpstreamResult<Value> {
        self.call(Method::POST, "/auth/login", Some(payload), Credentials::Anonymous)
            .await
    }

    /// `POST /auth/signup`
    pub async fn signup(&self, payload: &Value) -> UpstreamResult<Value> {
        self.call(Method::POST, "/auth/signup", Some(payload), Credentials::Anonymous)
            .await
    }

    /// `POST /auth/logout` with the session bearer token
    ///
    /// Success is decided by the status alone: a 2xx reply whose body is not
    /// JSON still means the token was revoked.
    pub async fn logout(&self, token: &str) -> UpstreamResult<()> {
        match self
            .call(Method::POST, "/auth/logout", None, Credentials::Bearer(token))
            .await
        {
            Ok(_) => Ok(()),
            Err(UpstreamError::Unparsable { status }) if status.is_success() => {
                debug!("Upstream logout answered {} with a non-JSON body", status);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// `GET /users/me`, the authoritative session check
    pub async fn current_user(&self, credentials: Credentials<'_>) -> UpstreamResult<Value> {
        self.call(Method::GET, "/users/me", None, credentials).await
    }

    /// Send a raw request to `backend_url + path_and_query`
    ///
    /// Only transport failures are mapped here; the response is returned as-is
    /// whatever its status.
    pub async fn forward<B>(
        &self,
        method: Method,
        path_and_query: &str,
        headers: HeaderMap,
        body: Option<B>,
    ) -> UpstreamResult<reqwest::Response>
    where
        B: Into<reqwest::Body>,
    {
        let url = format!("{}{}", self.backend_url, path_and_query);
        debug!("Forwarding {} {}", method, url);

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }
}

/// Turn an upstream response into JSON or a structured error
pub async fn normalize_response(response: reqwest::Response) -> UpstreamResult<Value> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let data = parse_body(status, &bytes)?;

    if status.is_success() {
        Ok(data)
    } else {
        warn!("Upstream responded with status {}", status);
        Err(status_error(status, data))
    }
}

/// Parse a response body as JSON, treating an empty body as `null`
pub fn parse_body(status: StatusCode, bytes: &[u8]) -> UpstreamResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(bytes).map_err(|e| {
        warn!("Upstream body is not JSON (status {}): {}", status, e);
        UpstreamError::Unparsable { status }
    })
}

/// Build a status error from a `{detail | message, code?, details?}` body
///
/// A body that is not a JSON object is replaced by `{"detail": <message>}` so
/// relayed errors always carry an object.
fn status_error(status: StatusCode, body: Value) -> UpstreamError {
    let message = body
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .unwrap_or(DEFAULT_ERROR_MESSAGE)
        .to_string();

    let code = body
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);

    let details = body
        .get("details")
        .and_then(|d| serde_json::from_value::<HashMap<String, Vec<String>>>(d.clone()).ok());

    let body = if body.is_object() {
        body
    } else {
        json!({ "detail": message })
    };

    UpstreamError::Status {
        status,
        message,
        code,
        details,
        body,
    }
}
