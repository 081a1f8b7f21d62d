//! Session token storage in an HTTP-only cookie
//!
//! The bearer token lives only in the `auth_token` cookie; there is no
//! server-side session table. Everything that reads or writes that cookie goes
//! through [`TokenCookieStore`].

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use common::config::GatewayConfig;
use time::Duration;
use tracing::debug;

/// Cookie holding the bearer token
pub const AUTH_COOKIE: &str = "auth_token";

/// Script-visible cookie bumped on logout so client caches notice the change
pub const FORCE_REFRESH_COOKIE: &str = "force-refresh";

/// Max-age used when the upstream expiry is already past (24 hours)
pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60 * 24;

/// Cookie max-age for a token expiring at `expires_at`
///
/// Never zero or negative: browsers would treat that as a deletion.
pub fn max_age_secs(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let max_age = (expires_at - now).num_milliseconds().div_euclid(1000);
    if max_age > 0 {
        max_age
    } else {
        DEFAULT_MAX_AGE_SECS
    }
}

/// Store for the session token cookie
#[derive(Debug, Clone)]
pub struct TokenCookieStore {
    secure: bool,
}

impl TokenCookieStore {
    /// Create a new store; `secure` controls the `Secure` attribute
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Secure cookies in production builds only
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.is_production())
    }

    /// Raw token value, if the cookie is present and non-empty
    pub fn read(&self, jar: &CookieJar) -> Option<String> {
        jar.get(AUTH_COOKIE)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Store `token` until `expires_at`
    pub fn set(&self, jar: CookieJar, token: &str, expires_at: DateTime<Utc>) -> CookieJar {
        self.set_at(jar, token, expires_at, Utc::now())
    }

    /// Same as [`Self::set`] with an explicit clock
    pub fn set_at(
        &self,
        jar: CookieJar,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CookieJar {
        let max_age = max_age_secs(expires_at, now);
        debug!("Setting session cookie with max-age {}s", max_age);

        let cookie = Cookie::build((AUTH_COOKIE, token.to_string()))
            .http_only(true)
            .secure(self.secure)
            .path("/")
            .same_site(SameSite::Strict)
            .max_age(Duration::seconds(max_age));

        jar.add(cookie)
    }

    /// Delete the session cookie
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(AUTH_COOKIE).path("/"))
    }

    /// Set the force-refresh cookie to a fresh random value
    pub fn force_refresh(&self, jar: CookieJar) -> CookieJar {
        let value = rand::random::<f64>().to_string();
        jar.add(Cookie::build((FORCE_REFRESH_COOKIE, value)).path("/"))
    }
}
