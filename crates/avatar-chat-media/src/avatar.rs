//! Avatar presentation: model asset, lip-sync, and the per-frame loop.
//!
//! The renderer itself is an external sink. This module owns what the
//! renderer is fed: a mouth-openness value derived from the speaking state
//! on every frame.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Peak mouth openness while speaking.
pub const MOUTH_AMPLITUDE: f32 = 0.5;
/// Angular speed of the mouth oscillation (radians per second).
pub const MOUTH_FREQUENCY: f32 = 10.0;

/// Mouth openness for a given clock time: `|sin(t * 10)| * 0.5` while speaking, else 0.
pub fn mouth_openness(elapsed_secs: f32, speaking: bool) -> f32 {
    if speaking {
        (elapsed_secs * MOUTH_FREQUENCY).sin().abs() * MOUTH_AMPLITUDE
    } else {
        0.0
    }
}

/// Tracks the animation clock and the speaking input.
#[derive(Debug, Default)]
pub struct LipSync {
    speaking: bool,
    elapsed: f32,
}

impl LipSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        self.speaking = speaking;
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Advance the clock by `delta` and return this frame's mouth openness.
    pub fn advance(&mut self, delta: Duration) -> f32 {
        self.elapsed += delta.as_secs_f32();
        mouth_openness(self.elapsed, self.speaking)
    }
}

/// A binary glTF avatar model (`.vrm` / `.glb`), loaded once.
#[derive(Debug, Clone)]
pub struct AvatarAsset {
    pub path: PathBuf,
    pub version: u32,
    pub data: Vec<u8>,
}

const GLB_MAGIC: &[u8; 4] = b"glTF";

impl AvatarAsset {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read avatar model {}", path.display()))?;
        let asset = Self::from_bytes(path.to_path_buf(), data)?;
        info!(path = %path.display(), version = asset.version, size = asset.data.len(), "Avatar model loaded");
        Ok(asset)
    }

    pub fn from_bytes(path: PathBuf, data: Vec<u8>) -> Result<Self> {
        if data.len() < 12 || &data[..4] != GLB_MAGIC {
            bail!("{} is not a binary glTF/VRM file", path.display());
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Ok(Self { path, version, data })
    }
}

/// Sink for per-frame avatar updates.
pub trait AvatarRenderer: Send {
    /// Apply the mouth openness for this frame and draw.
    fn frame(&mut self, mouth_open: f32, delta: Duration);

    /// Release every retained resource. Called once on teardown.
    fn dispose(&mut self);
}

/// Renderer without a display; keeps the last applied state.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub asset: Option<AvatarAsset>,
    pub frames: u64,
    pub mouth_open: f32,
    pub peak_mouth_open: f32,
    pub disposed: bool,
}

impl HeadlessRenderer {
    pub fn new(asset: Option<AvatarAsset>) -> Self {
        Self {
            asset,
            ..Self::default()
        }
    }
}

impl AvatarRenderer for HeadlessRenderer {
    fn frame(&mut self, mouth_open: f32, delta: Duration) {
        self.frames += 1;
        self.mouth_open = mouth_open;
        self.peak_mouth_open = self.peak_mouth_open.max(mouth_open);
        trace!(frame = self.frames, mouth_open, ?delta, "Avatar frame");
    }

    fn dispose(&mut self) {
        self.asset = None;
        self.disposed = true;
        debug!(frames = self.frames, "Avatar renderer disposed");
    }
}

/// Drive `renderer` at `fps` until `cancel` fires, then dispose it and hand it back.
pub async fn run_frame_loop<R: AvatarRenderer>(
    mut renderer: R,
    fps: u32,
    speaking: watch::Receiver<bool>,
    cancel: CancellationToken,
) -> R {
    let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lip_sync = LipSync::new();
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                let delta = now - last;
                last = now;

                lip_sync.set_speaking(*speaking.borrow());
                let mouth_open = lip_sync.advance(delta);
                renderer.frame(mouth_open, delta);
            }
        }
    }

    renderer.dispose();
    renderer
}
