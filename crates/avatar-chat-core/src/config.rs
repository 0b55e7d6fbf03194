//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AvatarChatError, Result};

/// Number of prior transcript messages sent with each chat request.
pub const HISTORY_WINDOW_SIZE: usize = 10;

const DEFAULT_PERSONA: &str = "You are a fortune teller who chats in a bright, friendly tone \
and slips into playful gyaru slang at the key moments of a reading or when the mood picks up. \
Keep answers short and to the point, adding a brief follow-up only when it helps. Treat the \
readings seriously but with humor, covering tarot, astrology, blood types, numerology and more, \
and explain any jargon in plain words so the user enjoys a quick, upbeat conversation.";

/// Top-level Avatar Chat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub avatar: AvatarConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Which side of the newest user message the history window is computed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryBoundary {
    /// Window over history before the new message is appended; the new
    /// message is then sent after the window.
    #[default]
    ExcludeNewest,
    /// Window over history after the append; the new message is the last
    /// element of the window.
    IncludeNewest,
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Provider: "openai" (default) or "gemini".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Env var holding the key (default: OPENAI_API_KEY, or GEMINI_API_KEY for gemini).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,

    #[serde(default)]
    pub history_boundary: HistoryBoundary,

    /// Persona preamble sent as the system message of every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl ChatConfig {
    pub fn provider(&self) -> &str {
        self.provider.as_deref().unwrap_or("openai")
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        let env = self.api_key_env.clone().or_else(|| {
            Some(match self.provider() {
                "gemini" => "GEMINI_API_KEY".to_string(),
                _ => "OPENAI_API_KEY".to_string(),
            })
        });
        resolve_secret_field(&self.api_key, &env)
    }

    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider() {
            "gemini" => "gemini-2.0-flash-exp".to_string(),
            _ => "gpt-4o".to_string(),
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(0.8)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(500)
    }

    pub fn history_window(&self) -> usize {
        self.history_window.unwrap_or(HISTORY_WINDOW_SIZE)
    }

    pub fn persona(&self) -> &str {
        self.persona.as_deref().unwrap_or(DEFAULT_PERSONA)
    }
}

/// Voice-synthesis provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Env var holding the key (default: NIJIVOICE_API_KEY).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Voice actor ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Output format (default: "mp3").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Speak assistant replies (default: true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl VoiceConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        let env = self
            .api_key_env
            .clone()
            .or_else(|| Some("NIJIVOICE_API_KEY".to_string()));
        resolve_secret_field(&self.api_key, &env)
    }

    pub fn voice_id(&self) -> &str {
        self.voice_id
            .as_deref()
            .unwrap_or("99092fb8-d5b2-4fcf-a948-a5e456a71412")
    }

    pub fn speed(&self) -> &str {
        self.speed.as_deref().unwrap_or("1.0")
    }

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or("mp3")
    }

    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Audio relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Base URL clients use to reach the relay (default: http://localhost:<port>).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Upstream fetch timeout in seconds.
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

fn default_relay_port() -> u16 {
    3001
}

fn default_relay_timeout() -> u64 {
    30
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            bind: None,
            public_url: None,
            timeout_secs: default_relay_timeout(),
        }
    }
}

impl RelayConfig {
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn public_url(&self) -> String {
        self.public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

/// Avatar renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Path to the `.vrm` / `.glb` model file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
}

impl AvatarConfig {
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_path.as_ref().map(|p| {
            let expanded = shellexpand::tilde(p);
            PathBuf::from(expanded.as_ref())
        })
    }

    pub fn fps(&self) -> u32 {
        self.fps.unwrap_or(60)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "avatar_chat_relay=debug").
    #[serde(default)]
    pub filters: Vec<String>,
}

fn default_log_format() -> String {
    "plain".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse config text (JSON5) after env substitution.
    pub fn parse(raw: &str) -> Result<Self> {
        let substituted = substitute_env_vars(raw);
        json5::from_str(&substituted).map_err(|e| AvatarChatError::Config(e.to_string()))
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        match self.chat.provider() {
            "openai" | "gemini" => {}
            other => errors.push(format!("Unknown chat provider '{other}'")),
        }

        if self.chat.resolve_api_key().is_none() {
            warnings.push(format!(
                "Chat provider '{}' has no API key configured",
                self.chat.provider()
            ));
        }

        if self.voice.enabled() && self.voice.resolve_api_key().is_none() {
            warnings.push("Voice synthesis has no API key configured".to_string());
        }

        if self.relay.port == 0 {
            errors.push("Relay port cannot be 0".to_string());
        }

        if self.avatar.fps() == 0 {
            errors.push("Avatar fps cannot be 0".to_string());
        }

        if let Some(path) = self.avatar.model_path() {
            if !path.exists() {
                warnings.push(format!("Avatar model not found: {}", path.display()));
            }
        }

        (warnings, errors)
    }
}

/// Base directory for Avatar Chat data: `~/.avatar_chat/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".avatar_chat")
}
