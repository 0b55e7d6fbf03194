//! Terminal front end: prompt, transcript display and the avatar loop.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use avatar_chat_agent::controller::{Companion, speaker_label};
use avatar_chat_core::config::Config;
use avatar_chat_media::avatar::{AvatarAsset, HeadlessRenderer, run_frame_loop};
use avatar_chat_media::player::AudioPlayer;

const PROMPT: &str = "Ask me anything";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Message(String),
    Clear,
    Stop,
    Voice(bool),
    Quit,
    Unknown(String),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/clear" => Input::Clear,
        "/stop" => Input::Stop,
        "/voice on" => Input::Voice(true),
        "/voice off" => Input::Voice(false),
        "/quit" | "/exit" => Input::Quit,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd.to_string()),
        text => Input::Message(text.to_string()),
    }
}

fn player() -> Arc<dyn AudioPlayer> {
    #[cfg(feature = "speaker")]
    {
        Arc::new(avatar_chat_media::speaker::SpeakerPlayer::new())
    }
    #[cfg(not(feature = "speaker"))]
    {
        Arc::new(avatar_chat_media::player::NullPlayer)
    }
}

fn print_exchange(companion: &Companion) {
    for message in companion.display_messages() {
        println!("{}: {}", speaker_label(&message), message.content());
    }
    if let Some(error) = companion.error() {
        println!("! {error}");
    }
}

async fn load_avatar(config: &Config) -> Option<AvatarAsset> {
    let path = config.avatar.model_path()?;
    match AvatarAsset::load(&path).await {
        Ok(asset) => Some(asset),
        Err(e) => {
            warn!(%e, "Continuing without avatar model");
            None
        }
    }
}

pub async fn run(config: &Config, message: Option<String>, voice: bool) -> anyhow::Result<()> {
    let companion = Companion::from_config(config, player())?;
    if !voice {
        companion.set_voice_enabled(false);
    }

    let cancel = CancellationToken::new();
    let renderer = HeadlessRenderer::new(load_avatar(config).await);
    let avatar = tokio::spawn(run_frame_loop(
        renderer,
        config.avatar.fps(),
        companion.speaking(),
        cancel.clone(),
    ));

    match message {
        Some(text) => {
            companion.submit(&text).await;
            print_exchange(&companion);
            // Let the reply finish playing before exiting.
            let mut speaking = companion.speaking();
            let _ = speaking.wait_for(|s| !*s).await;
        }
        None => interactive(&companion).await?,
    }

    companion.stop();
    cancel.cancel();
    let renderer = avatar.await?;
    info!(frames = renderer.frames, "Avatar loop finished");
    Ok(())
}

async fn interactive(companion: &Companion) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("{PROMPT} (/clear, /stop, /voice on|off, /quit)");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Clear => {
                companion.clear();
                println!("Conversation cleared.");
            }
            Input::Stop => companion.stop(),
            Input::Voice(enabled) => {
                companion.set_voice_enabled(enabled);
                println!("Voice {}.", if enabled { "on" } else { "off" });
            }
            Input::Unknown(cmd) => println!("Unknown command: {cmd}"),
            Input::Message(text) => {
                companion.submit(&text).await;
                print_exchange(companion);
            }
        }
    }

    Ok(())
}
