//! Gateway configuration
//!
//! The configuration is read once at startup and handed to every handler through
//! the application state. Request handling never looks at the process environment.

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::ConfigError;

/// Deployment mode, controls the `Secure` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl std::str::FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    backend_url: String,
    upstream_api_prefix: String,
    frontend_url: String,
    app_env: String,
    bind_addr: String,
    upstream_timeout_secs: u64,
    max_body_bytes: usize,
    pages_dir: String,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream backend base URL, without trailing slash
    pub backend_url: String,
    /// Path prefix of the upstream auth and user endpoints (e.g. "/api/v1")
    pub upstream_api_prefix: String,
    /// Frontend origin, used for CORS and absolute redirects
    pub frontend_url: String,
    pub app_env: AppEnv,
    pub bind_addr: String,
    pub upstream_timeout: Duration,
    /// Largest request body the proxy will buffer
    pub max_body_bytes: usize,
    /// Directory of pages served behind the session gate
    pub pages_dir: String,
}

impl GatewayConfig {
    /// Create a new GatewayConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BACKEND_URL`: upstream base URL (default: "http://localhost:8000")
    /// - `UPSTREAM_API_PREFIX`: upstream API prefix (default: "/api/v1")
    /// - `FRONTEND_URL`: frontend origin (default: "http://localhost:3000")
    /// - `APP_ENV`: "development" or "production" (default: "development")
    /// - `BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    /// - `UPSTREAM_TIMEOUT_SECS`: upstream call timeout (default: 10)
    /// - `MAX_BODY_BYTES`: proxied body limit (default: 10 MiB)
    /// - `PAGES_DIR`: static pages directory (default: "public")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    /// Build the configuration from an explicit environment source
    pub fn load(source: Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = Config::builder()
            .set_default("backend_url", "http://localhost:8000")?
            .set_default("upstream_api_prefix", "/api/v1")?
            .set_default("frontend_url", "http://localhost:3000")?
            .set_default("app_env", "development")?
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("upstream_timeout_secs", 10)?
            .set_default("max_body_bytes", 10 * 1024 * 1024)?
            .set_default("pages_dir", "public")?
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let backend_url = normalize_origin("BACKEND_URL", &raw.backend_url)?;
        let frontend_url = normalize_origin("FRONTEND_URL", &raw.frontend_url)?;

        let app_env = raw.app_env.parse().map_err(|reason| ConfigError::Invalid {
            key: "APP_ENV",
            reason,
        })?;

        if raw.upstream_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let prefix = raw.upstream_api_prefix.trim().trim_end_matches('/');
        let upstream_api_prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{}", prefix)
        };

        Ok(GatewayConfig {
            backend_url,
            upstream_api_prefix,
            frontend_url,
            app_env,
            bind_addr: raw.bind_addr,
            upstream_timeout: Duration::from_secs(raw.upstream_timeout_secs),
            max_body_bytes: raw.max_body_bytes,
            pages_dir: raw.pages_dir,
        })
    }

    /// Whether cookies must carry the `Secure` attribute
    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    /// Absolute URL of a frontend path
    pub fn frontend_path(&self, path: &str) -> String {
        format!("{}{}", self.frontend_url, path)
    }
}

fn normalize_origin(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim().trim_end_matches('/');
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("'{}' is not an http(s) URL", value),
        });
    }
    Ok(value.to_string())
}
