//! Reconnecting websocket client for the SkillGuru community chat.
//!
//! [`ConnectionManager`] owns one channel per user, retries dropped
//! connections with a bounded linear backoff, and hands inbound messages to a
//! [`Handler`]. [`ChatApi`] covers the REST side (rooms and history).

pub mod api;
mod config;
pub mod connection;
mod driver;
mod endpoint;
mod error;
mod handler;
mod manager;
mod state;

#[cfg(test)]
mod testing;

pub use api::{ChatApi, reconcile};
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_ENDPOINTS};
pub use connection::{Channel, ChannelEvent, ReconnectPolicy, Transport, WsTransport};
pub use endpoint::channel_url;
pub use error::ClientError;
pub use handler::{CallbackHandler, Handler, NoopHandler};
pub use manager::ConnectionManager;
pub use state::ConnectionState;

pub use guru_protocol::server::{ConnectionInfo, PresenceChange, RoomJoined, TypingIndicator};
pub use guru_protocol::{
    ChatMessage, ChatRoom, ClientCommand, CreateRoomRequest, MessageType, RoomType, ServerFrame,
    close_code,
};
