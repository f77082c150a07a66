use serde::{Deserialize, Serialize};

use crate::ParseError;

const ROOM_NAME_MIN: usize = 2;
const ROOM_NAME_MAX: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    File,
    Image,
    Video,
    Audio,
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    General,
    Course,
    StudyGroup,
    Project,
    Help,
    Private,
}

/// A chat message as the backend broadcasts it.
///
/// Only `room_id` and `content` are required; the backend fills the rest but
/// older payloads omit some of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub message_id: String,
    pub room_id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    /// ISO-8601, kept as the server sent it
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub room_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Body of a room creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
    pub tags: Vec<String>,
}

impl CreateRoomRequest {
    /// Build a public general room request, validating the name the way the
    /// backend does (trimmed, 2 to 100 characters).
    pub fn new(name: &str) -> Result<Self, ParseError> {
        let name = name.trim();
        let len = name.chars().count();
        if len < ROOM_NAME_MIN {
            return Err(ParseError::InvalidRoomName(format!(
                "must be at least {} characters",
                ROOM_NAME_MIN
            )));
        }
        if len > ROOM_NAME_MAX {
            return Err(ParseError::InvalidRoomName(format!(
                "cannot exceed {} characters",
                ROOM_NAME_MAX
            )));
        }

        Ok(Self {
            name: name.to_string(),
            description: String::new(),
            room_type: RoomType::General,
            is_public: true,
            max_members: None,
            tags: Vec::new(),
        })
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn room_type(mut self, room_type: RoomType) -> Self {
        self.room_type = room_type;
        self
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn max_members(mut self, max: u32) -> Self {
        self.max_members = Some(max);
        self
    }
}

/// Envelope every REST endpoint of the backend responds with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, turning a failed envelope into an error message.
    pub fn into_data(self) -> Result<T, String> {
        if !self.success {
            let mut message = self.message;
            if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
                message = format!("{} ({})", message, errors.join("; "));
            }
            return Err(message);
        }

        self.data
            .ok_or_else(|| "response envelope has no data".to_string())
    }
}
