//! Shared reqwest client construction.

mod user_agent;

pub use user_agent::{resolve_user_agent, BROWSER_USER_AGENTS, USER_AGENT};

use std::time::Duration;

use reqwest::Client;

/// Build a client with compression and a per-request timeout.
pub fn build_client(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Same as [`build_client`] but accepts invalid TLS certificates.
///
/// Only used for the single retry against publisher hosts with broken
/// certificate chains.
pub fn build_insecure_client(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .danger_accept_invalid_certs(true)
        .build()
}

/// True when a Content-Type header value names the given MIME type.
pub fn content_type_is(content_type: Option<&str>, mime: &str) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(mime))
}
