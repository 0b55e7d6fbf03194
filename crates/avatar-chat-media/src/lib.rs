//! Temporary audio clips, playback backends and avatar lip-sync.

pub mod avatar;
pub mod clip;
pub mod player;
#[cfg(feature = "speaker")]
pub mod speaker;
