//! NijiVoice text-to-speech provider.
//!
//! The generate-voice endpoint answers either with the audio bytes directly
//! or with JSON naming a hosted audio file (`generatedVoice.audioFileUrl`).
//! Hosted files must be retrieved through the relay, so they are returned
//! as [`SynthesizedVoice::RemoteFile`] rather than fetched here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use avatar_chat_core::error::{AvatarChatError, Result};

use crate::{
    AudioPayload, SynthesisRequest, SynthesizedVoice, VoiceSynthesizer, content_type,
    network_error,
};

const NIJIVOICE_BASE_URL: &str = "https://api.nijivoice.com";

pub struct NijiVoiceProvider {
    pub base_url: String,
    pub voice_id: String,
    client: reqwest::Client,
}

impl NijiVoiceProvider {
    pub fn new(base_url: Option<&str>, voice_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(NIJIVOICE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            voice_id: voice_id.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/platform/v1/voice-actors/{}/generate-voice",
            self.base_url, self.voice_id
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVoiceResponse {
    #[serde(default)]
    generated_voice: Option<GeneratedVoice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedVoice {
    #[serde(default)]
    audio_file_url: Option<String>,
}

/// Extract the hosted audio URL from a JSON generate-voice response.
fn parse_remote_url(body: &[u8]) -> Result<String> {
    let data: GenerateVoiceResponse = serde_json::from_slice(body)?;
    data.generated_voice
        .and_then(|v| v.audio_file_url)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AvatarChatError::InvalidResponse("No audio URL in response".into()))
}

#[async_trait]
impl VoiceSynthesizer for NijiVoiceProvider {
    fn id(&self) -> &str {
        "nijivoice"
    }

    fn display_name(&self) -> &str {
        "NijiVoice"
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        api_key: &str,
    ) -> Result<SynthesizedVoice> {
        debug!(
            voice = %self.voice_id,
            text_len = request.script.len(),
            format = %request.format,
            "Requesting voice synthesis"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("accept", "audio/mpeg")
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .json(&json!({
                "script": request.script,
                "speed": request.speed,
                "format": request.format,
            }))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AvatarChatError::Synthesis {
                status: status.as_u16(),
                message: body,
            });
        }

        let ct = content_type(&response);
        let body = response.bytes().await.map_err(network_error)?;

        if ct.as_deref().is_some_and(|c| c.contains("application/json")) {
            let url = parse_remote_url(&body)?;
            debug!(%url, "Voice synthesized to hosted file");
            Ok(SynthesizedVoice::RemoteFile { url })
        } else {
            debug!(bytes = body.len(), "Voice synthesized inline");
            Ok(SynthesizedVoice::Audio(AudioPayload::new(body, ct.as_deref())))
        }
    }
}
