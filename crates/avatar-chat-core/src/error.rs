use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvatarChatError {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Failed to fetch audio: {0}")]
    UpstreamFetch(String),

    #[error("{0} API key is not configured")]
    MissingCredential(String),

    #[error("API request failed: {status} - {message}")]
    ApiRequest { status: u16, message: String },

    #[error("Voice synthesis failed: {status} - {message}")]
    Synthesis { status: u16, message: String },

    #[error("Failed to fetch audio file from proxy: {0}")]
    ProxyFetch(String),

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AvatarChatError {
    /// HTTP status carried by provider failures, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiRequest { status, .. } | Self::Synthesis { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AvatarChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AvatarChatError::MissingCredential("OpenAI".into());
        assert_eq!(err.to_string(), "OpenAI API key is not configured");

        let err = AvatarChatError::ApiRequest {
            status: 401,
            message: "Incorrect API key provided".into(),
        };
        assert_eq!(
            err.to_string(),
            "API request failed: 401 - Incorrect API key provided"
        );
        assert_eq!(err.status(), Some(401));

        let err = AvatarChatError::MissingParameter("url");
        assert_eq!(err.to_string(), "Missing url parameter");
        assert_eq!(err.status(), None);
    }
}
