//! Audio playback seam.
//!
//! A player plays one clip at a time and reports lifecycle transitions on
//! an event channel. `Started` is sent only once audio is actually playing.

use tokio::sync::mpsc;
use tracing::debug;

use avatar_chat_providers::AudioPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Ended,
    Failed(String),
}

pub trait AudioPlayer: Send + Sync {
    /// Begin playing `audio`, replacing anything currently playing.
    ///
    /// Errors returned here mean playback never began; later failures are
    /// reported as [`PlaybackEvent::Failed`].
    fn play(
        &self,
        audio: AudioPayload,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> anyhow::Result<()>;

    /// Halt playback and rewind. No further events are sent for the stopped clip.
    fn stop(&self);
}

/// Player with no audio device: playback starts and ends immediately.
#[derive(Debug, Default)]
pub struct NullPlayer;

impl AudioPlayer for NullPlayer {
    fn play(
        &self,
        audio: AudioPayload,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> anyhow::Result<()> {
        debug!(
            bytes = audio.bytes.len(),
            content_type = %audio.content_type,
            "Null player discarding audio"
        );
        let _ = events.send(PlaybackEvent::Started);
        let _ = events.send(PlaybackEvent::Ended);
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_player_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        NullPlayer
            .play(AudioPayload::new(vec![1u8, 2], None), tx)
            .unwrap();
        assert_eq!(rx.recv().await, Some(PlaybackEvent::Started));
        assert_eq!(rx.recv().await, Some(PlaybackEvent::Ended));
        assert_eq!(rx.recv().await, None);
    }
}
