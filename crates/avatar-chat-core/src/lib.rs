//! Core types, config, errors, and transcript model for Avatar Chat.

pub mod config;
pub mod error;
pub mod message;
