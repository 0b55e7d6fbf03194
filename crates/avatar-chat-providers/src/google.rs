//! Google Generative AI (Gemini) provider.
//!
//! Non-streaming `generateContent` requests. Auth is via API key in query parameter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_core::message::{ChatMessage, Role};

use crate::{ChatProvider, ChatRequest, network_error, provider_error_message};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    pub base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// --- Gemini request/response types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<serde_json::Value>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

/// Split chat messages into Gemini `contents` and an optional system instruction.
///
/// Gemini has no system role in `contents`; assistant turns use role `model`.
fn format_messages(messages: &[ChatMessage]) -> (Vec<serde_json::Value>, Option<serde_json::Value>) {
    let mut contents = Vec::new();
    let mut system_parts = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(json!({ "text": msg.content })),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{ "text": msg.content }],
            })),
            Role::Assistant => contents.push(json!({
                "role": "model",
                "parts": [{ "text": msg.content }],
            })),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(json!({ "parts": system_parts }))
    };

    (contents, system_instruction)
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String> {
        let (contents, system_instruction) = format_messages(&request.messages);

        let body = GeminiRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );

        debug!(model = %request.model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .header("content-type", "application/json")
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

        let data: GenerateContentResponse = response.json().await.map_err(network_error)?;
        data.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| AvatarChatError::InvalidResponse("No candidates in response".into()))
    }
}
