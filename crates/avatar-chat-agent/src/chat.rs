//! Chat orchestration: transcript ownership and one request at a time.
//!
//! `send_message` appends the user's message before any network call, so
//! the transcript reflects the request even when the call fails. The
//! assistant's message is appended only after a successful response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use avatar_chat_core::config::{ChatConfig, HistoryBoundary};
use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_core::message::{ChatMessage, Message, Transcript};
use avatar_chat_providers::{ChatProvider, ChatRequest};

/// Resolved chat settings.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub history_window: usize,
    pub history_boundary: HistoryBoundary,
    pub persona: String,
    pub api_key: Option<String>,
}

impl ChatSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            model: config.model(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
            history_window: config.history_window(),
            history_boundary: config.history_boundary,
            persona: config.persona().to_string(),
            api_key: config.resolve_api_key(),
        }
    }
}

/// Build the outbound message list: persona, history window, new message.
pub fn build_messages(
    settings: &ChatSettings,
    history: &Transcript,
    user: &Message,
) -> Vec<ChatMessage> {
    let window = match settings.history_boundary {
        HistoryBoundary::ExcludeNewest => history.recent(settings.history_window),
        // The new message occupies the last slot of the window.
        HistoryBoundary::IncludeNewest => {
            history.recent(settings.history_window.saturating_sub(1))
        }
    };

    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(ChatMessage::system(settings.persona.clone()));
    messages.extend(window.iter().map(Message::to_chat_message));
    messages.push(user.to_chat_message());
    messages
}

#[derive(Default)]
struct ChatState {
    transcript: Transcript,
    error: Option<String>,
    /// Bumped by `clear_messages` so a reply to a cleared conversation is dropped.
    epoch: u64,
}

/// Resets the busy flag when a request settles or its future is dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ChatOrchestrator {
    provider: Arc<dyn ChatProvider>,
    settings: ChatSettings,
    state: Mutex<ChatState>,
    busy: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: ChatSettings) -> Self {
        Self {
            provider,
            settings,
            state: Mutex::new(ChatState::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// Send a user message and return the assistant's reply.
    ///
    /// Returns `None` for blank input, while another request is in flight,
    /// or on failure (the failure text is then available from [`Self::error`]).
    pub async fn send_message(&self, user_text: &str) -> Option<String> {
        if user_text.trim().is_empty() {
            return None;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(error = %AvatarChatError::Busy("Chat request"), "Rejecting message");
            return None;
        }
        let _guard = BusyGuard(&self.busy);

        match self.exchange(user_text).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!(%e, provider = self.provider.id(), "Chat request failed");
                self.state.lock().unwrap().error = Some(e.to_string());
                None
            }
        }
    }

    async fn exchange(&self, user_text: &str) -> Result<String> {
        let (request, epoch) = {
            let mut state = self.state.lock().unwrap();
            state.error = None;

            let user = Message::user(user_text);
            let messages = build_messages(&self.settings, &state.transcript, &user);
            state.transcript.push(user);

            let request = ChatRequest {
                model: self.settings.model.clone(),
                messages,
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            };
            (request, state.epoch)
        };

        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            AvatarChatError::MissingCredential(self.provider.display_name().to_string())
        })?;

        debug!(
            provider = self.provider.id(),
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );
        let reply = self.provider.complete(&request, api_key).await?;

        let mut state = self.state.lock().unwrap();
        if state.epoch == epoch {
            state.transcript.push(Message::assistant(reply.clone()));
        } else {
            debug!("Transcript cleared during request, reply not recorded");
        }
        info!(reply_len = reply.len(), "Chat reply received");
        Ok(reply)
    }

    /// Empty the transcript and clear any error.
    pub fn clear_messages(&self) {
        let mut state = self.state.lock().unwrap();
        state.transcript.clear();
        state.error = None;
        state.epoch += 1;
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().transcript.messages().to_vec()
    }

    /// The latest question/answer pair.
    pub fn display_messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().transcript.recent(2).to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }
}
