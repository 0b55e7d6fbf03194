//! Relay shared state.

use std::time::Duration;

use avatar_chat_core::config::RelayConfig;

/// Shared state accessible from all relay handlers.
pub struct RelayState {
    pub config: RelayConfig,
    /// Upstream client, reused across requests.
    pub client: reqwest::Client,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}
