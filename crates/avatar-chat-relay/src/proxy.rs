//! `GET /proxy-audio`: fetch a remote audio file and pass it through.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, error, info};

use avatar_chat_core::error::{AvatarChatError, Result};

use crate::error::RelayError;
use crate::state::RelayState;

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";
const CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn proxy_audio(
    State(state): State<Arc<RelayState>>,
    query: std::result::Result<Query<ProxyQuery>, QueryRejection>,
) -> std::result::Result<Response, RelayError> {
    let Query(query) = query.map_err(|rejection| {
        RelayError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    })?;
    let url = query
        .url
        .filter(|u| !u.is_empty())
        .ok_or(AvatarChatError::MissingParameter("url"))?;

    info!(%url, "Proxying audio request");

    let (bytes, content_type) = fetch_upstream(&state.client, &url).await.map_err(|e| {
        error!(%url, %e, "Audio proxy fetch failed");
        RelayError::from(e)
    })?;

    debug!(%url, size = bytes.len(), %content_type, "Audio proxied");

    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
        ],
        bytes,
    )
        .into_response())
}

/// Fetch `url` and return its body plus the upstream content type.
pub async fn fetch_upstream(client: &reqwest::Client, url: &str) -> Result<(Bytes, String)> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AvatarChatError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AvatarChatError::UpstreamFetch(status.as_u16().to_string()));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AvatarChatError::Network(e.to_string()))?;

    Ok((bytes, content_type))
}
