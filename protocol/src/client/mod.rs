use serde::Serialize;

use crate::MessageType;

/// Frames the client writes to the chat backend.
///
/// Every frame is serialized as an envelope `{"type": .., "data": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// {"type":"message","data":{room_id,content,sender_name,message_type}}
    Message {
        room_id: String,
        content: String,
        sender_name: String,
        message_type: MessageType,
    },

    /// {"type":"join_room","data":{room_id}}
    JoinRoom { room_id: String },

    /// {"type":"leave_room","data":{room_id}}
    LeaveRoom { room_id: String },

    /// {"type":"typing","data":{room_id,is_typing}}
    Typing { room_id: String, is_typing: bool },
}

impl ClientCommand {
    /// A plain text chat message.
    pub fn text(room_id: &str, content: &str, sender_name: &str) -> Self {
        Self::Message {
            room_id: room_id.to_string(),
            content: content.to_string(),
            sender_name: sender_name.to_string(),
            message_type: MessageType::Text,
        }
    }

    pub fn join(room_id: &str) -> Self {
        Self::JoinRoom {
            room_id: room_id.to_string(),
        }
    }

    pub fn leave(room_id: &str) -> Self {
        Self::LeaveRoom {
            room_id: room_id.to_string(),
        }
    }

    /// Room the frame is addressed to
    pub fn room_id(&self) -> &str {
        match self {
            Self::Message { room_id, .. }
            | Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::Typing { room_id, .. } => room_id,
        }
    }

    /// Serialize to the JSON text frame sent over the socket
    pub fn to_wire_format(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
