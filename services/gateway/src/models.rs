//! Request and response payloads of the auth endpoints

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::validation::{Validator, validate_email, validate_name, validate_password};

/// A single validation failure, located by field path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.to_string()],
            message: message.into(),
        }
    }

    /// An error about the body as a whole
    pub fn body(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }
}

/// Parse a JSON request body, reporting syntax or type errors as a field error
pub fn parse_body<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, Vec<FieldError>> {
    serde_json::from_slice(bytes)
        .map_err(|e| vec![FieldError::body(format!("Invalid request body: {}", e))])
}

/// Login request as received from the browser
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login payload sent upstream, only built from a validated request
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<LoginPayload, Vec<FieldError>> {
        let mut validator = Validator::new();
        let email = validator.field("email", self.email.as_deref(), validate_email);
        let password = validator.field("password", self.password.as_deref(), validate_password);

        match (email, password) {
            (Some(email), Some(password)) => Ok(LoginPayload {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(validator.finish().err().unwrap_or_default()),
        }
    }
}

/// Signup request as received from the browser
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Signup payload sent upstream
#[derive(Debug, Clone, Serialize)]
pub struct SignupPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<SignupPayload, Vec<FieldError>> {
        let mut validator = Validator::new();
        let first_name = validator.field("first_name", self.first_name.as_deref(), validate_name);
        let last_name = validator.field("last_name", self.last_name.as_deref(), validate_name);
        let email = validator.field("email", self.email.as_deref(), validate_email);
        let password = validator.field("password", self.password.as_deref(), validate_password);

        match (first_name, last_name, email, password) {
            (Some(first_name), Some(last_name), Some(email), Some(password)) => Ok(SignupPayload {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(validator.finish().err().unwrap_or_default()),
        }
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_at: String,
    user_id: String,
}

/// Token issued by upstream on login or signup
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    /// `expires_at` exactly as upstream formatted it
    pub expires_at_raw: String,
    pub user_id: Uuid,
}

impl TokenResponse {
    /// Validate the shape of an upstream token response
    pub fn from_value(value: Value) -> Result<Self, String> {
        let raw: RawTokenResponse =
            serde_json::from_value(value).map_err(|e| format!("invalid token response: {}", e))?;

        let expires_at = parse_datetime(&raw.expires_at)
            .ok_or_else(|| format!("expires_at is not an ISO datetime: {}", raw.expires_at))?;
        let user_id = Uuid::parse_str(&raw.user_id)
            .map_err(|e| format!("user_id is not a UUID: {}", e))?;

        Ok(TokenResponse {
            access_token: raw.access_token,
            token_type: raw.token_type,
            expires_at,
            expires_at_raw: raw.expires_at,
            user_id,
        })
    }
}

/// Parse an ISO-8601 datetime; values without an offset are taken as UTC
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Body returned to the browser after login or signup
///
/// Deliberately carries no token.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub expires_at: String,
}

impl From<&TokenResponse> for SessionResponse {
    fn from(token: &TokenResponse) -> Self {
        SessionResponse {
            user_id: token.user_id,
            expires_at: token.expires_at_raw.clone(),
        }
    }
}
