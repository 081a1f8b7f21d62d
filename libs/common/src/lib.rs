//! Common library for the care-match gateway
//!
//! This crate provides functionality shared by services that front the
//! upstream backend: configuration loading, the upstream HTTP client and
//! its error taxonomy.

pub mod config;
pub mod error;
pub mod upstream;

/// Example usage of the upstream client
///
/// ```rust,no_run
/// use common::config::GatewayConfig;
/// use common::upstream::{Credentials, UpstreamClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = GatewayConfig::from_env()?;
///     let client = UpstreamClient::new(&config)?;
///     let me = client.current_user(Credentials::Bearer("token")).await?;
///     println!("Current user: {}", me);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
