//! Application state shared across handlers

use std::sync::Arc;

use common::{config::GatewayConfig, error::UpstreamResult, upstream::UpstreamClient};

use crate::session::TokenCookieStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstream: UpstreamClient,
    pub cookies: TokenCookieStore,
}

impl AppState {
    /// Build the state from an explicit configuration
    pub fn new(config: GatewayConfig) -> UpstreamResult<Self> {
        let upstream = UpstreamClient::new(&config)?;
        let cookies = TokenCookieStore::from_config(&config);

        Ok(AppState {
            config: Arc::new(config),
            upstream,
            cookies,
        })
    }
}
