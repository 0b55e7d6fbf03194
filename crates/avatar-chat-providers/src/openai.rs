//! OpenAI Chat Completions API provider.
//!
//! Non-streaming requests against `/v1/chat/completions`. Also works for
//! any OpenAI-compatible endpoint via `base_url`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_core::message::ChatMessage;

use crate::{ChatProvider, ChatRequest, network_error, provider_error_message};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiProvider {
    pub base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// --- OpenAI request/response types ---

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String> {
        let body = OpenAiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            base_url = %self.base_url,
            "Calling OpenAI chat completions"
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AvatarChatError::ApiRequest {
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        let completion: ChatCompletion = response.json().await.map_err(network_error)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AvatarChatError::InvalidResponse("No choices in completion".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("hi")];
        let body = OpenAiRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.8,
            max_tokens: 500,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_base_url_trimmed() {
        let provider = OpenAiProvider::new(Some("http://localhost:9999/"));
        assert_eq!(provider.base_url, "http://localhost:9999");
    }
}
