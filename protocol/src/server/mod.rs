
use crate::{ChatMessage, ParseError};
use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Sent once after the backend accepts the socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionInfo {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

/// Confirmation of our own `join_room`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomJoined {
    pub room_id: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub online_members: Vec<String>,
}

/// Another user entered or left a room we are in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresenceChange {
    pub room_id: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub member_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypingIndicator {
    pub room_id: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub is_typing: bool,
}

/// One inbound frame, decoded from `{"type": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Message(ChatMessage),
    ConnectionEstablished(ConnectionInfo),
    RoomJoined(RoomJoined),
    UserJoined(PresenceChange),
    UserLeft(PresenceChange),
    Typing(TypingIndicator),
    /// A well-formed envelope with a type we do not handle
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Parse a complete WebSocket text frame
pub fn parse_server_frame(frame: &str) -> Result<ServerFrame> {
    let envelope: Envelope =
        serde_json::from_str(frame).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let kind = envelope
        .kind
        .ok_or_else(|| ParseError::MissingField("type".to_string()))?;

    let frame = match kind.as_str() {
        "message" => ServerFrame::Message(parse_data(&kind, envelope.data)?),
        "connection_established" => {
            ServerFrame::ConnectionEstablished(parse_data(&kind, envelope.data)?)
        }
        "room_joined" => ServerFrame::RoomJoined(parse_data(&kind, envelope.data)?),
        "user_joined" => ServerFrame::UserJoined(parse_data(&kind, envelope.data)?),
        "user_left" => ServerFrame::UserLeft(parse_data(&kind, envelope.data)?),
        "typing_indicator" => ServerFrame::Typing(parse_data(&kind, envelope.data)?),
        _ => ServerFrame::Unknown(kind),
    };

    Ok(frame)
}

fn parse_data<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T> {
    if data.is_null() {
        return Err(ParseError::MissingField(format!("{} data", kind)).into());
    }

    serde_json::from_value(data).map_err(|e| {
        ParseError::InvalidPayload {
            kind: kind.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
