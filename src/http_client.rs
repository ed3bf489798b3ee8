//! HTTP client used for stream availability probes
//!
//! Features:
//! - HTTP/2 when the server offers it, HTTP/1.1 otherwise
//! - TLS 1.3 via rustls
//! - Connection pooling with keep-alive, so repeated probes reuse one socket
//! - Short timeouts: a hung probe must not stall the poll loop

use std::time::Duration;

use reqwest::Client;

use crate::error::Result;

/// User agent sent with every probe.
pub const USER_AGENT: &str = concat!("voodoo-player/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by availability checks.
pub fn probe_client() -> Result<Client> {
    probe_client_with_timeout(Duration::from_secs(10))
}

/// Build a probe client with a custom request timeout.
pub fn probe_client_with_timeout(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        // Don't assume HTTP/2 - let server negotiate
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    Ok(client)
}
