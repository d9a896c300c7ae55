//! Outbound HTTP transport policy.
//!
//! Idle connections are never kept for reuse: a backup run is short-lived and
//! the upload hosts differ from the API host, so pooled sockets only go stale.

use crate::config::DiskConfig;
use crate::utils::errors::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total per-request timeout, including streaming the body
    pub timeout: Duration,

    pub connect_timeout: Duration,

    /// Drop connections after each response instead of pooling them
    pub disable_keep_alive: bool,
}

impl TransportConfig {
    pub fn from_disk(config: &DiskConfig) -> Self {
        Self {
            timeout: config.timeout,
            connect_timeout: config.connect_timeout,
            disable_keep_alive: true,
        }
    }

    /// Build a client enforcing this policy
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("yd-backup/", env!("CARGO_PKG_VERSION")));

        if self.disable_keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(builder.build()?)
    }
}
