//! Voice orchestration: synthesis, clip lifecycle, speaking state.
//!
//! Every `speak` call takes a new generation number. State changes made
//! after an await point are applied only while that generation is still
//! the newest, so an overtaken request can neither install its clip nor
//! flip the speaking state owned by its successor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use avatar_chat_core::config::VoiceConfig;
use avatar_chat_core::error::{AvatarChatError, Result};
use avatar_chat_media::clip::{ClipHandle, ClipStore};
use avatar_chat_media::player::{AudioPlayer, PlaybackEvent};
use avatar_chat_providers::{
    AudioFetcher, AudioPayload, SynthesisRequest, SynthesizedVoice, VoiceSynthesizer,
};

#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub speed: String,
    pub format: String,
    pub api_key: Option<String>,
}

impl VoiceSettings {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            speed: config.speed().to_string(),
            format: config.format().to_string(),
            api_key: config.resolve_api_key(),
        }
    }
}

#[derive(Default)]
struct VoiceState {
    clip: Option<ClipHandle>,
    error: Option<String>,
    loading: bool,
}

struct VoiceInner {
    synthesizer: Arc<dyn VoiceSynthesizer>,
    fetcher: Arc<dyn AudioFetcher>,
    player: Arc<dyn AudioPlayer>,
    clips: ClipStore,
    settings: VoiceSettings,
    generation: AtomicU64,
    state: Mutex<VoiceState>,
    speaking: watch::Sender<bool>,
}

/// Cheap to clone; clones share one playback state.
#[derive(Clone)]
pub struct VoiceOrchestrator {
    inner: Arc<VoiceInner>,
}

impl VoiceOrchestrator {
    pub fn new(
        synthesizer: Arc<dyn VoiceSynthesizer>,
        fetcher: Arc<dyn AudioFetcher>,
        player: Arc<dyn AudioPlayer>,
        settings: VoiceSettings,
    ) -> Self {
        let (speaking, _) = watch::channel(false);
        Self {
            inner: Arc::new(VoiceInner {
                synthesizer,
                fetcher,
                player,
                clips: ClipStore::new(),
                settings,
                generation: AtomicU64::new(0),
                state: Mutex::new(VoiceState::default()),
                speaking,
            }),
        }
    }

    /// Synthesize `text` and start playing it.
    ///
    /// Returns once playback has started or the attempt failed; later
    /// playback events are handled in the background.
    pub async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.inner.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        if let Err(e) = self.inner.clone().run(generation, text).await {
            error!(%e, generation, "Voice playback failed");
            if self.inner.is_current(generation) {
                let mut state = self.inner.state.lock().unwrap();
                state.error = Some(e.to_string());
                state.loading = false;
                drop(state);
                self.inner.speaking.send_replace(false);
            }
        }
    }

    /// Halt playback and release the current clip. Safe to call at any time.
    pub fn stop(&self) {
        self.inner.player.stop();
        let clip = self.inner.state.lock().unwrap().clip.take();
        if let Some(handle) = clip {
            self.inner.clips.revoke(&handle);
            debug!(%handle, "Playback stopped");
        }
        self.inner.speaking.send_replace(false);
    }

    pub fn is_speaking(&self) -> bool {
        *self.inner.speaking.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().unwrap().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.lock().unwrap().error.clone()
    }

    /// Number of clips not yet released.
    pub fn live_clips(&self) -> usize {
        self.inner.clips.live_count()
    }

    /// Speaking-state feed for the avatar.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.speaking.subscribe()
    }
}

impl VoiceInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(self: Arc<Self>, generation: u64, text: &str) -> Result<()> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            AvatarChatError::MissingCredential(self.synthesizer.display_name().to_string())
        })?;

        let request = SynthesisRequest {
            script: text.to_string(),
            speed: self.settings.speed.clone(),
            format: self.settings.format.clone(),
        };
        let payload = match self.synthesizer.synthesize(&request, api_key).await? {
            SynthesizedVoice::Audio(payload) => payload,
            SynthesizedVoice::RemoteFile { url } => {
                debug!(%url, "Voice returned a remote file");
                self.fetcher.fetch(&url).await?
            }
        };

        if !self.is_current(generation) {
            debug!(generation, "Discarding audio from superseded request");
            return Ok(());
        }

        let (tx, mut events) = mpsc::unbounded_channel();
        let handle = self.install(payload.clone());
        if let Err(e) = self.player.play(payload, tx) {
            self.release(handle);
            return Err(AvatarChatError::Playback(e.to_string()));
        }

        match events.recv().await {
            Some(event) => self.handle_event(generation, handle, event),
            None => {
                // Stopped before it started.
                self.release(handle);
                if self.is_current(generation) {
                    self.state.lock().unwrap().loading = false;
                }
                return Ok(());
            }
        }

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(generation, handle, event);
            }
            self.release(handle);
        });
        Ok(())
    }

    /// Release the previous clip and register the new one.
    fn install(&self, payload: AudioPayload) -> ClipHandle {
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.clip.take() {
            self.clips.revoke(&previous);
        }
        let handle = self.clips.create(payload);
        state.clip = Some(handle);
        handle
    }

    /// Release `handle`, clearing the current slot only if it still holds it.
    ///
    /// Returns true when no other clip occupies the slot, i.e. `handle` was
    /// the audio the speaking state describes.
    fn release(&self, handle: ClipHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        let owned = match state.clip {
            Some(current) if current == handle => {
                state.clip = None;
                true
            }
            Some(_) => false,
            None => true,
        };
        self.clips.revoke(&handle);
        owned
    }

    fn handle_event(&self, generation: u64, handle: ClipHandle, event: PlaybackEvent) {
        let current = self.is_current(generation);
        match event {
            PlaybackEvent::Started => {
                let mut state = self.state.lock().unwrap();
                // A stop() between play and start has already taken the clip.
                if current && state.clip == Some(handle) {
                    state.loading = false;
                    drop(state);
                    self.speaking.send_replace(true);
                    info!(%handle, "Playback started");
                }
            }
            // Speaking follows the clip that is playing, not the newest request:
            // a pending synthesis does not keep a finished clip "speaking".
            PlaybackEvent::Ended => {
                if self.release(handle) {
                    self.speaking.send_replace(false);
                }
                debug!(%handle, "Playback ended");
            }
            PlaybackEvent::Failed(reason) => {
                warn!(%handle, %reason, "Playback failed");
                if current {
                    let mut state = self.state.lock().unwrap();
                    state.error = Some(AvatarChatError::Playback(reason).to_string());
                    state.loading = false;
                }
                if self.release(handle) {
                    self.speaking.send_replace(false);
                }
            }
        }
    }
}
