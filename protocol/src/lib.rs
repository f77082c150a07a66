use thiserror::Error;

pub mod client;
pub mod model;
pub mod server;

pub use client::ClientCommand;
pub use model::{
    ApiResponse, ChatMessage, ChatRoom, CreateRoomRequest, MessageType, RoomType,
};
pub use server::{ServerFrame, parse_server_frame};

/// WebSocket close codes the chat backend and client care about.
pub mod close_code {
    /// Normal closure; never triggers a reconnect.
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    /// Close frame arrived without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// Stream dropped or handshake failed.
    pub const ABNORMAL: u16 = 1006;
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Invalid room name: {0}")]
    InvalidRoomName(String),
}
