//! Binds user input to the chat orchestrator and pipes replies to voice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

use avatar_chat_core::config::Config;
use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_core::message::{Message, Role};
use avatar_chat_media::player::AudioPlayer;
use avatar_chat_providers::ChatProvider;
use avatar_chat_providers::google::GeminiProvider;
use avatar_chat_providers::openai::OpenAiProvider;
use avatar_chat_providers::relay_client::RelayClient;
use avatar_chat_providers::voice::NijiVoiceProvider;

use crate::chat::{ChatOrchestrator, ChatSettings};
use crate::voice::{VoiceOrchestrator, VoiceSettings};

pub const STATUS_THINKING: &str = "Reading the cards...";
pub const STATUS_GENERATING_VOICE: &str = "Generating voice...";

/// Label shown next to a transcript entry.
pub fn speaker_label(message: &Message) -> &'static str {
    match message.role() {
        Role::User => "YOU",
        _ => "CHARACTER",
    }
}

pub struct Companion {
    chat: ChatOrchestrator,
    voice: VoiceOrchestrator,
    voice_enabled: AtomicBool,
}

impl Companion {
    pub fn new(chat: ChatOrchestrator, voice: VoiceOrchestrator, voice_enabled: bool) -> Self {
        Self {
            chat,
            voice,
            voice_enabled: AtomicBool::new(voice_enabled),
        }
    }

    /// Wire up the configured providers, the relay client and `player`.
    pub fn from_config(config: &Config, player: Arc<dyn AudioPlayer>) -> Result<Self> {
        let base_url = config.chat.base_url.as_deref();
        let provider: Arc<dyn ChatProvider> = match config.chat.provider() {
            "openai" => Arc::new(OpenAiProvider::new(base_url)),
            "gemini" => Arc::new(GeminiProvider::new(base_url)),
            other => {
                return Err(AvatarChatError::Config(format!(
                    "Unknown chat provider: {other}"
                )));
            }
        };

        let synthesizer = Arc::new(NijiVoiceProvider::new(
            config.voice.base_url.as_deref(),
            config.voice.voice_id(),
        ));
        let fetcher = Arc::new(RelayClient::new(&config.relay.public_url()));

        info!(
            provider = provider.id(),
            model = %config.chat.model(),
            relay = %config.relay.public_url(),
            voice = config.voice.enabled(),
            "Companion configured"
        );

        Ok(Self::new(
            ChatOrchestrator::new(provider, ChatSettings::from_config(&config.chat)),
            VoiceOrchestrator::new(
                synthesizer,
                fetcher,
                player,
                VoiceSettings::from_config(&config.voice),
            ),
            config.voice.enabled(),
        ))
    }

    /// Send `text` to the character and, with voice on, speak the reply.
    pub async fn submit(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() || self.chat.is_loading() {
            debug!("Ignoring submit");
            return None;
        }

        let reply = self.chat.send_message(text).await?;
        if self.voice_enabled() {
            self.voice.speak(&reply).await;
        }
        Some(reply)
    }

    pub fn clear(&self) {
        self.chat.clear_messages();
    }

    pub fn stop(&self) {
        self.voice.stop();
    }

    pub fn set_voice_enabled(&self, enabled: bool) {
        self.voice_enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.voice.stop();
        }
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::SeqCst)
    }

    /// Chat error first, then voice error.
    pub fn error(&self) -> Option<String> {
        self.chat.error().or_else(|| self.voice.error())
    }

    pub fn display_messages(&self) -> Vec<Message> {
        self.chat.display_messages()
    }

    pub fn status_line(&self) -> Option<&'static str> {
        if self.chat.is_loading() {
            Some(STATUS_THINKING)
        } else if self.voice.is_loading() {
            Some(STATUS_GENERATING_VOICE)
        } else {
            None
        }
    }

    pub fn speaking(&self) -> watch::Receiver<bool> {
        self.voice.subscribe()
    }

    pub fn chat(&self) -> &ChatOrchestrator {
        &self.chat
    }

    pub fn voice(&self) -> &VoiceOrchestrator {
        &self.voice
    }
}
