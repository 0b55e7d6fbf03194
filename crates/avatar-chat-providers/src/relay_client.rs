//! Client for the audio relay's `/proxy-audio` endpoint.

use async_trait::async_trait;
use tracing::debug;

use avatar_chat_core::error::{AvatarChatError, Result};

use crate::{AudioFetcher, AudioPayload, content_type};

pub struct RelayClient {
    pub base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// The relay URL that retrieves `target` on our behalf.
    pub fn proxy_url(&self, target: &str) -> String {
        format!(
            "{}/proxy-audio?url={}",
            self.base_url,
            urlencoding::encode(target)
        )
    }
}

#[async_trait]
impl AudioFetcher for RelayClient {
    async fn fetch(&self, url: &str) -> Result<AudioPayload> {
        let proxy_url = self.proxy_url(url);
        debug!(%proxy_url, "Fetching audio through relay");

        let response = self
            .client
            .get(&proxy_url)
            .send()
            .await
            .map_err(|e| AvatarChatError::ProxyFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvatarChatError::ProxyFetch(format!("relay returned {status}")));
        }

        let ct = content_type(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AvatarChatError::ProxyFetch(e.to_string()))?;

        Ok(AudioPayload::new(bytes, ct.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_url_encodes_target() {
        let client = RelayClient::new("http://localhost:3001/");
        assert_eq!(
            client.proxy_url("https://storage.example/a b.mp3?sig=x&y=1"),
            "http://localhost:3001/proxy-audio?url=https%3A%2F%2Fstorage.example%2Fa%20b.mp3%3Fsig%3Dx%26y%3D1"
        );
    }
}
