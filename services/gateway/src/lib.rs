//! Session gateway in front of the care-match frontend
//!
//! Authenticates page requests through the `auth_token` cookie, proxies API
//! calls to the upstream backend with the session's credentials, and runs the
//! login, signup and logout lifecycle of that cookie.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod models;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;
