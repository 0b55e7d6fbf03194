//! Outbound HTTP clients.
//!
//! Chat-completion providers implement [`ChatProvider`], voice-synthesis
//! providers implement [`VoiceSynthesizer`], and remote audio files are
//! retrieved through the relay by an [`AudioFetcher`].

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_core::message::ChatMessage;

#[cfg(feature = "gemini")]
pub mod google;
#[cfg(feature = "openai")]
pub mod openai;
pub mod relay_client;
pub mod voice;

/// Content type assumed when an audio response does not declare one.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// A chat-completion request.
///
/// `messages` is the full ordered list sent to the provider, starting with
/// the persona/system message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// The core chat-completion provider trait.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier (e.g., "openai", "gemini").
    fn id(&self) -> &str;

    /// Name used in user-facing messages (e.g., "OpenAI").
    fn display_name(&self) -> &str;

    /// Run a non-streaming completion and return the assistant text.
    async fn complete(&self, request: &ChatRequest, api_key: &str) -> Result<String>;
}

/// Playable audio bytes plus their declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Bytes,
    pub content_type: String,
}

impl AudioPayload {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
                .to_string(),
        }
    }
}

/// Text-to-speech request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub script: String,
    pub speed: String,
    pub format: String,
}

/// What a voice provider handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesizedVoice {
    /// The response body is the audio.
    Audio(AudioPayload),
    /// The response named a remote audio file that must go through the relay.
    RemoteFile { url: String },
}

/// The core voice-synthesis provider trait.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    async fn synthesize(&self, request: &SynthesisRequest, api_key: &str)
    -> Result<SynthesizedVoice>;
}

/// Retrieves a remote audio file on the caller's behalf.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<AudioPayload>;
}

/// Map a transport-level `reqwest` failure into the shared error type.
pub(crate) fn network_error(e: reqwest::Error) -> AvatarChatError {
    AvatarChatError::Network(e.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pull `error.message` out of a provider error body, falling back to "Unknown error".
pub(crate) fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Read the response content type header, if any.
pub(crate) fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
