//! Audio relay server.
//!
//! Remote audio files named by the voice provider are not served with
//! cross-origin headers, so the client retrieves them through this relay:
//! `GET /proxy-audio?url=<target>` fetches the target server-side and
//! returns the bytes with permissive CORS and cache headers.

pub mod error;
pub mod proxy;
pub mod server;
pub mod state;

pub use server::{relay_router, start_relay};
pub use state::RelayState;
