//! HTTP Client Pool for maintaining persistent connections per base URL.
//!
//! This module provides a process-wide pool of reqwest::Client instances, one per base URL,
//! so that repeated questions to the same provider reuse connections, DNS lookups and TLS
//! sessions instead of paying for them on every call.
//!
//! Clients carry no overall request timeout; the per-call deadline is applied by the bridge
//! around each provider call.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

lazy_static! {
    /// Global HTTP client pool, lazily initialized on first access.
    static ref HTTP_CLIENT_POOL: Mutex<HashMap<String, reqwest::Client>> =
        Mutex::new(HashMap::new());
}

/// Get or create a shared HTTP client for the given base URL.
pub fn get_http_client(base_url: &str) -> reqwest::Client {
    let mut pool = HTTP_CLIENT_POOL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(client) = pool.get(base_url) {
        return client.clone();
    }

    let client = create_pooled_client();
    pool.insert(base_url.to_string(), client.clone());
    client
}

/// Number of distinct base URLs with a pooled client.
pub fn pooled_client_count() -> usize {
    HTTP_CLIENT_POOL
        .lock()
        .map(|pool| pool.len())
        .unwrap_or_else(|poisoned| poisoned.into_inner().len())
}

fn create_pooled_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        // Keep idle connections alive for 90 seconds
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|err| {
            log::warn!(
                "http_pool::create_pooled_client(): falling back to default client: {}",
                err
            );
            reqwest::Client::new()
        })
}
