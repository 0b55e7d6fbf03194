//! Speaker playback through the default output device (rodio).
//!
//! Each clip plays on its own thread, which owns the output stream for the
//! clip's lifetime and polls the sink until it drains or is stopped.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error};

use avatar_chat_providers::AudioPayload;

use crate::player::{AudioPlayer, PlaybackEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Default)]
pub struct SpeakerPlayer {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl SpeakerPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn play_blocking(
    audio: AudioPayload,
    stopped: &AtomicBool,
    events: &mpsc::UnboundedSender<PlaybackEvent>,
) -> anyhow::Result<()> {
    let stream = rodio::OutputStreamBuilder::open_default_stream()
        .map_err(|e| anyhow::anyhow!("Audio output unavailable: {e}"))?;
    let sink = rodio::Sink::connect_new(stream.mixer());
    let source = rodio::Decoder::new(Cursor::new(audio.bytes))
        .map_err(|e| anyhow::anyhow!("Audio decode failed: {e}"))?;
    sink.append(source);

    if stopped.load(Ordering::SeqCst) {
        return Ok(());
    }
    let _ = events.send(PlaybackEvent::Started);

    while !sink.empty() {
        if stopped.load(Ordering::SeqCst) {
            sink.stop();
            debug!("Speaker playback stopped");
            return Ok(());
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let _ = events.send(PlaybackEvent::Ended);
    Ok(())
}

impl AudioPlayer for SpeakerPlayer {
    fn play(
        &self,
        audio: AudioPayload,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> anyhow::Result<()> {
        self.stop();

        let stopped = Arc::new(AtomicBool::new(false));
        *self.current.lock().unwrap() = Some(stopped.clone());

        std::thread::Builder::new()
            .name("avatar-chat-speaker".into())
            .spawn(move || {
                if let Err(e) = play_blocking(audio, &stopped, &events) {
                    error!(%e, "Speaker playback failed");
                    if !stopped.load(Ordering::SeqCst) {
                        let _ = events.send(PlaybackEvent::Failed(e.to_string()));
                    }
                }
            })?;

        Ok(())
    }

    fn stop(&self) {
        if let Some(flag) = self.current.lock().unwrap().take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
