//! Shared HTTP clients, one per backend endpoint and timeout.
//!
//! Every LLM-backed agent in a pipeline usually talks to the same generation
//! endpoint. Handing them all the same `reqwest::Client` lets them reuse one
//! connection pool instead of paying for a new TCP (and possibly TLS)
//! handshake on every turn.
//!
//! Clients are configured with:
//! - `timeout`: the per-request budget requested by the caller
//! - `pool_idle_timeout`: idle connections are kept for 90 seconds
//! - `tcp_keepalive`: keepalive probes every 60 seconds

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Global cache of HTTP clients keyed by endpoint and timeout.
static CLIENT_POOL: Lazy<DashMap<String, reqwest::Client>> = Lazy::new(DashMap::new);

fn pool_key(endpoint: &str, timeout: Duration) -> String {
    format!("{}#{}ms", endpoint, timeout.as_millis())
}

/// Get or create the shared client for `endpoint` with the given request timeout.
pub fn get_or_create_client(
    endpoint: &str,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let key = pool_key(endpoint, timeout);
    if let Some(client) = CLIENT_POOL.get(&key) {
        return Ok(client.clone());
    }

    let client = create_pooled_client(timeout)?;
    log::debug!("created HTTP client for {}", key);
    // A concurrent caller may have won the race; keep whichever landed first.
    Ok(CLIENT_POOL.entry(key).or_insert(client).clone())
}

fn create_pooled_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
}
