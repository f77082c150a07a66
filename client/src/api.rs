use std::collections::HashSet;

use anyhow::{Context, Result, anyhow, bail};
use guru_protocol::{ApiResponse, ChatMessage, ChatRoom, CreateRoomRequest};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::ClientError;
use crate::config::ClientConfig;

/// Thin client for the chat backend's REST endpoints, used to fetch rooms
/// and message history around reconnects.
#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base: Url,
}

impl ChatApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: &str| ClientError::InvalidEndpoint {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let base = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url)
    }

    /// GET /api/chat/rooms
    pub async fn rooms(&self) -> Result<Vec<ChatRoom>> {
        let url = self.url(&["api", "chat", "rooms"]);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to fetch rooms")?;

        read_envelope(response).await
    }

    /// GET /api/chat/rooms/{room_id}/messages?limit=N
    pub async fn messages(&self, room_id: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let url = self.url(&["api", "chat", "rooms", room_id, "messages"]);
        let response = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await
            .with_context(|| format!("Failed to fetch messages for room {}", room_id))?;

        read_envelope(response).await
    }

    /// POST /api/chat/rooms
    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<ChatRoom> {
        let url = self.url(&["api", "chat", "rooms"]);
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .context("Failed to send create room request")?;

        read_envelope(response).await
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    decode_envelope(status, &body)
}

fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => bail!("Request failed with status {}: {}", status, body),
        Err(e) => return Err(e).context("Failed to parse response"),
    };

    if !status.is_success() && envelope.success {
        bail!("Request failed with status {}", status);
    }

    envelope
        .into_data()
        .map_err(|message| anyhow!("Request failed ({}): {}", status, message))
}

/// Messages from a history fetch that the caller has not seen yet, in order.
pub fn reconcile(seen: &HashSet<String>, fetched: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut added = HashSet::new();

    fetched
        .into_iter()
        .filter(|message| {
            message.message_id.is_empty()
                || (!seen.contains(&message.message_id) && added.insert(message.message_id.clone()))
        })
        .collect()
}
