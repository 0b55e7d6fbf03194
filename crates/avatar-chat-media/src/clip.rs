//! In-memory store of temporary audio clips.
//!
//! A clip is the backing data for one playable audio object. Clips are
//! created per synthesis and revoked once playback ends, fails, or is
//! stopped, or when a newer clip supersedes them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use avatar_chat_providers::AudioPayload;
use tracing::trace;
use uuid::Uuid;

/// Opaque reference to a live clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipHandle(Uuid);

impl fmt::Display for ClipHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip:{}", self.0)
    }
}

#[derive(Default)]
pub struct ClipStore {
    clips: Mutex<HashMap<ClipHandle, AudioPayload>>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register audio and return its handle.
    pub fn create(&self, payload: AudioPayload) -> ClipHandle {
        let handle = ClipHandle(Uuid::new_v4());
        trace!(%handle, bytes = payload.bytes.len(), "Clip created");
        self.clips.lock().unwrap().insert(handle, payload);
        handle
    }

    pub fn get(&self, handle: &ClipHandle) -> Option<AudioPayload> {
        self.clips.lock().unwrap().get(handle).cloned()
    }

    /// Release a clip. Returns false if it was already gone.
    pub fn revoke(&self, handle: &ClipHandle) -> bool {
        let removed = self.clips.lock().unwrap().remove(handle).is_some();
        if removed {
            trace!(%handle, "Clip revoked");
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.clips.lock().unwrap().len()
    }
}
