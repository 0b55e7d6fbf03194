//! Conversation orchestration for the avatar companion.

pub mod chat;
pub mod controller;
pub mod voice;

pub use chat::ChatOrchestrator;
pub use controller::Companion;
pub use voice::VoiceOrchestrator;
